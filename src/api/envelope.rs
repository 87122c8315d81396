use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::models::{de, ChatUser, Comment, Message, Post, Profile, ProfilePatch, User};

/// The `{ success, message? }` head every endpoint returns. The payload
/// fields sit beside it at the top level of the same object.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "de::flag")]
    pub success: bool,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub message: Option<String>,
}

/// Payload of a successful call plus the server's optional message.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub message: Option<String>,
    pub data: T,
}

/// Decode a response body: check the envelope head, then the payload.
///
/// Rejections usually carry no payload, so the head is checked first.
///
/// # Errors
///
/// Returns [`ApiError::Rejected`] when `success` is false and
/// [`ApiError::Decode`] when either part is malformed.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Reply<T>, ApiError> {
    let head: Envelope = serde_json::from_slice(body)?;
    if !head.success {
        return Err(ApiError::Rejected {
            message: head.message.unwrap_or_default(),
        });
    }
    let data = serde_json::from_slice(body)?;
    Ok(Reply {
        message: head.message,
        data,
    })
}

/// Payload for endpoints that only acknowledge.
#[derive(Debug, Default, Deserialize)]
pub struct Ack {}

#[derive(Debug, Deserialize)]
pub struct PostsPage {
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub struct PostDetail {
    pub post: Post,
}

#[derive(Debug, Deserialize)]
pub struct CommentsPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LikeData {
    #[serde(default, deserialize_with = "de::opt_int")]
    pub like_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserLikes {
    #[serde(default, deserialize_with = "de::int_list")]
    pub liked_posts: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChatUsersPage {
    #[serde(default)]
    pub users: Vec<ChatUser>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesPage {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct OnlineStatus {
    #[serde(default, deserialize_with = "de::flag")]
    pub online: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProfileData {
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdated {
    #[serde(default)]
    pub profile: Option<ProfilePatch>,
}

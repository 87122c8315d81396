//! HTTP client for the blog's `api.php` backend.
//!
//! Every call goes through [`ApiClient::call`], which builds the
//! `api.php?action=<name>` URL, places the session token where the endpoint
//! expects it, and decodes the `{ success, message?, ... }` envelope.

pub mod endpoints;
pub mod envelope;
pub mod error;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::models::{ChatUser, Comment, Message, Post, Profile, ProfilePatch, User};

pub use endpoints::{Endpoint, TokenPlacement};
pub use envelope::Reply;
pub use error::ApiError;

use envelope::{
    Ack, ChatUsersPage, CommentsPage, LikeData, LoginData, MessagesPage, OnlineStatus,
    PostDetail, PostsPage, ProfileData, ProfileUpdated, UserLikes,
};

const USER_AGENT: &str = concat!("blog-client/", env!("CARGO_PKG_VERSION"));

/// Credentials for `login`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub captcha: String,
}

/// Fields for `register`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub captcha: String,
}

/// Fields for the contact form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
    pub captcha: String,
}

/// Avatar file attached to a profile update.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Multipart body for `update-profile`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: String,
    pub location: String,
    pub website: String,
    pub avatar: Option<AvatarUpload>,
}

/// Query for a page of chat messages.
#[derive(Debug, Clone, Copy)]
pub struct MessageQuery<'a> {
    pub partner_id: i64,
    pub limit: u32,
    pub offset: u32,
    /// Only messages newer than this server timestamp.
    pub since: Option<&'a str>,
}

/// Typed client for the remote blog API.
///
/// Cheap to clone; clones share the connection pool and cookie jar.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            // The captcha answer is tied to the PHP session cookie.
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of an uploaded image or avatar, `None` when unset.
    #[must_use]
    pub fn media_url(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            None
        } else if name.starts_with("http://") || name.starts_with("https://") {
            Some(name.to_string())
        } else {
            Some(format!(
                "{}/uploads/{}",
                self.base_url,
                name.trim_start_matches('/')
            ))
        }
    }

    /// Captcha image URL with a cache-busting stamp.
    #[must_use]
    pub fn captcha_url(&self, stamp: i64) -> String {
        format!("{}/captcha.php?t={stamp}", self.base_url)
    }

    #[must_use]
    pub fn admin_panel_url(&self) -> String {
        format!("{}/panel.php", self.base_url)
    }

    fn request(&self, endpoint: Endpoint, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/api.php", self.base_url);
        let mut builder = self
            .http
            .request(endpoint.method(), url)
            .query(&[("action", endpoint.action())]);

        match (endpoint.token_placement(), token) {
            (TokenPlacement::Header, Some(token)) => builder = builder.bearer_auth(token),
            (TokenPlacement::Query, Some(token)) => builder = builder.query(&[("token", token)]),
            _ => {}
        }
        builder
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        builder: RequestBuilder,
    ) -> Result<Reply<T>, ApiError> {
        debug!(action = endpoint.action(), "API call");
        let response = builder.send().await?;
        let status = response.status();
        debug!(action = endpoint.action(), %status, "API response");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(ApiError::Status { status, body });
        }

        let body = response.bytes().await?;
        envelope::decode(&body)
    }

    /// Perform one call: query parameters, optional JSON body, token placement.
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        token: Option<&str>,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Reply<T>, ApiError> {
        let mut builder = self.request(endpoint, token).query(query);

        let body = match (endpoint.token_placement(), token, body) {
            (TokenPlacement::Body, Some(token), Some(Value::Object(mut map))) => {
                map.insert("token".to_string(), Value::String(token.to_string()));
                Some(Value::Object(map))
            }
            (TokenPlacement::Body, Some(token), None) => Some(json!({ "token": token })),
            (_, _, body) => body,
        };
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        self.send(endpoint, builder).await
    }

    // Posts

    /// One page of posts. `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn posts(&self, page: u32, limit: u32, search: &str) -> Result<Vec<Post>, ApiError> {
        let reply: Reply<PostsPage> = self
            .call(
                Endpoint::Posts,
                None,
                &[
                    ("page", page.to_string()),
                    ("limit", limit.to_string()),
                    ("search", search.to_string()),
                ],
                None,
            )
            .await?;
        Ok(reply.data.posts)
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn post(&self, id: i64) -> Result<Post, ApiError> {
        let reply: Reply<PostDetail> = self
            .call(Endpoint::Post, None, &[("id", id.to_string())], None)
            .await?;
        Ok(reply.data.post)
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn increment_view(&self, post_id: i64) -> Result<(), ApiError> {
        let _: Reply<Ack> = self
            .call(Endpoint::View, None, &[("post_id", post_id.to_string())], None)
            .await?;
        Ok(())
    }

    /// Toggle the caller's like on a post; returns the server's new count.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn toggle_like(&self, token: &str, post_id: i64) -> Result<Option<i64>, ApiError> {
        let reply: Reply<LikeData> = self
            .call(
                Endpoint::Like,
                Some(token),
                &[],
                Some(json!({ "post_id": post_id })),
            )
            .await?;
        Ok(reply.data.like_count)
    }

    /// Ids of the posts the caller has liked.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn user_likes(&self, token: &str) -> Result<Vec<i64>, ApiError> {
        let reply: Reply<UserLikes> = self
            .call(Endpoint::UserLikes, Some(token), &[], None)
            .await?;
        Ok(reply.data.liked_posts)
    }

    // Comments

    /// Comments on a post. Without a page the server returns all of them.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn comments(
        &self,
        post_id: i64,
        page: Option<(u32, u32)>,
    ) -> Result<Vec<Comment>, ApiError> {
        let mut query = vec![("post_id", post_id.to_string())];
        if let Some((limit, offset)) = page {
            query.push(("limit", limit.to_string()));
            query.push(("offset", offset.to_string()));
        }
        let reply: Reply<CommentsPage> = self.call(Endpoint::Comments, None, &query, None).await?;
        Ok(reply.data.comments)
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn create_comment(
        &self,
        token: &str,
        post_id: i64,
        content: &str,
    ) -> Result<Reply<()>, ApiError> {
        let reply: Reply<Ack> = self
            .call(
                Endpoint::CreateComment,
                Some(token),
                &[],
                Some(json!({ "post_id": post_id, "content": content })),
            )
            .await?;
        Ok(Reply {
            message: reply.message,
            data: (),
        })
    }

    // Chat

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn chat_users(
        &self,
        token: &str,
        search: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatUser>, ApiError> {
        let reply: Reply<ChatUsersPage> = self
            .call(
                Endpoint::ChatUsers,
                Some(token),
                &[
                    ("search", search.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
                None,
            )
            .await?;
        Ok(reply.data.users)
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn chat_messages(
        &self,
        token: &str,
        query: MessageQuery<'_>,
    ) -> Result<Vec<Message>, ApiError> {
        let mut params = vec![
            ("user_id", query.partner_id.to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(since) = query.since {
            params.push(("since", since.to_string()));
        }
        let reply: Reply<MessagesPage> = self
            .call(Endpoint::ChatMessages, Some(token), &params, None)
            .await?;
        Ok(reply.data.messages)
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn send_message(
        &self,
        token: &str,
        receiver_id: i64,
        message: &str,
    ) -> Result<(), ApiError> {
        let _: Reply<Ack> = self
            .call(
                Endpoint::SendMessage,
                Some(token),
                &[],
                Some(json!({ "receiver_id": receiver_id, "message": message })),
            )
            .await?;
        Ok(())
    }

    /// Mark the caller's session alive.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn heartbeat(&self, token: &str) -> Result<(), ApiError> {
        let _: Reply<Ack> = self
            .call(Endpoint::Heartbeat, Some(token), &[], None)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn online_status(&self, username: &str) -> Result<bool, ApiError> {
        let reply: Reply<OnlineStatus> = self
            .call(
                Endpoint::OnlineStatus,
                None,
                &[("username", username.to_string())],
                None,
            )
            .await?;
        Ok(reply.data.online)
    }

    // Profiles

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn profile(&self, username: &str) -> Result<Profile, ApiError> {
        let reply: Reply<ProfileData> = self
            .call(
                Endpoint::Profile,
                None,
                &[("username", username.to_string())],
                None,
            )
            .await?;
        Ok(reply.data.profile)
    }

    /// Submit the profile edit form as multipart.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn update_profile(
        &self,
        token: &str,
        update: ProfileUpdate,
    ) -> Result<Reply<Option<ProfilePatch>>, ApiError> {
        let mut form = Form::new()
            .text("bio", update.bio)
            .text("location", update.location)
            .text("website", update.website);
        if let Some(avatar) = update.avatar {
            let part = Part::bytes(avatar.bytes)
                .file_name(avatar.file_name)
                .mime_str(&avatar.mime)?;
            form = form.part("avatar", part);
        }

        let builder = self
            .request(Endpoint::UpdateProfile, Some(token))
            .multipart(form);
        let reply: Reply<ProfileUpdated> = self.send(Endpoint::UpdateProfile, builder).await?;
        Ok(Reply {
            message: reply.message,
            data: reply.data.profile,
        })
    }

    // Accounts

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn login(&self, form: &LoginForm) -> Result<Reply<(String, User)>, ApiError> {
        let reply: Reply<LoginData> = self
            .call(Endpoint::Login, None, &[], Some(serde_json::to_value(form)?))
            .await?;
        Ok(Reply {
            message: reply.message,
            data: (reply.data.token, reply.data.user),
        })
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn register(&self, form: &RegisterForm) -> Result<Option<String>, ApiError> {
        self.acknowledge(Endpoint::Register, serde_json::to_value(form)?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn verify_email(&self, code: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(Endpoint::VerifyEmail, json!({ "code": code }))
            .await
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn newsletter_subscribe(
        &self,
        email: &str,
        captcha: &str,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            Endpoint::NewsletterSubscribe,
            json!({ "email": email, "captcha": captcha }),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error on transport, HTTP or envelope failure.
    pub async fn contact(&self, form: &ContactForm) -> Result<Option<String>, ApiError> {
        self.acknowledge(Endpoint::Contact, serde_json::to_value(form)?)
            .await
    }

    async fn acknowledge(&self, endpoint: Endpoint, body: Value) -> Result<Option<String>, ApiError> {
        let reply: Reply<Ack> = self.call(endpoint, None, &[], Some(body)).await?;
        Ok(reply.message)
    }

    /// Fetch a fresh captcha image; the server binds its answer to our session.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or HTTP failure.
    pub async fn captcha(&self, stamp: i64) -> Result<Bytes, ApiError> {
        let response = self.http.get(self.captcha_url(stamp)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: String::new(),
            });
        }
        Ok(response.bytes().await?)
    }
}

//! Client-side mirrors of the server's records.

pub mod de;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The logged-in user, cached in local storage between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub email: String,
    #[serde(default, deserialize_with = "de::string")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_admin: bool,
}

/// A blog post as listed on the home page or shown on its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub title: String,
    /// Rendered HTML.
    #[serde(default, deserialize_with = "de::string")]
    pub content: String,
    #[serde(default, deserialize_with = "de::string")]
    pub image: String,
    /// Comma separated, as stored by the backend.
    #[serde(default, deserialize_with = "de::string")]
    pub hashtags: String,
    #[serde(default, deserialize_with = "de::string")]
    pub username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::count")]
    pub like_count: i64,
    #[serde(default, deserialize_with = "de::count")]
    pub comment_count: i64,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub view_count: Option<i64>,
    #[serde(default, deserialize_with = "de::string")]
    pub created_at: String,
}

impl Post {
    /// Hashtags split out of the CSV column, without the leading `#`.
    #[must_use]
    pub fn hashtag_list(&self) -> Vec<String> {
        self.hashtags
            .split(',')
            .map(|tag| tag.trim().trim_start_matches('#').trim())
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub content: String,
    #[serde(default, deserialize_with = "de::string")]
    pub username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::string")]
    pub created_at: String,
}

/// A conversation partner in the chat sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub last_message: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub last_message_time: Option<String>,
    #[serde(default, deserialize_with = "de::count")]
    pub unread_count: i64,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_online: bool,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub last_seen: Option<String>,
}

/// Online state shown in the chat header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Online,
    LastSeen(String),
    Offline,
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::LastSeen(seen) => write!(f, "last seen {seen}"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

impl ChatUser {
    #[must_use]
    pub fn presence(&self) -> Presence {
        if self.is_online {
            Presence::Online
        } else if let Some(seen) = &self.last_seen {
            Presence::LastSeen(seen.clone())
        } else {
            Presence::Offline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::int")]
    pub sender_id: i64,
    #[serde(deserialize_with = "de::int")]
    pub receiver_id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub message: String,
    #[serde(default, deserialize_with = "de::string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "de::string")]
    pub sender_username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub sender_avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "de::string")]
    pub email: String,
    #[serde(default, deserialize_with = "de::string")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::string")]
    pub bio: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "de::count")]
    pub post_count: i64,
    #[serde(default, deserialize_with = "de::count")]
    pub comment_count: i64,
    #[serde(default, deserialize_with = "de::count")]
    pub like_count: i64,
}

/// Fields the server echoes back after a profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub avatar: Option<String>,
}

impl Profile {
    /// Overlay the fields present in `patch`.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(bio) = &patch.bio {
            self.bio.clone_from(bio);
        }
        if patch.location.is_some() {
            self.location.clone_from(&patch.location);
        }
        if patch.website.is_some() {
            self.website.clone_from(&patch.website);
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar.clone_from(avatar);
        }
    }
}

/// Parse a server or client timestamp.
///
/// Accepts RFC 3339 and the backend's `YYYY-MM-DD HH:MM:SS` (read as UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_php_payload() {
        let user: User = serde_json::from_str(
            r#"{"id":"5","username":"ali","email":"a@b.uz","avatar":null,"is_admin":"1"}"#,
        )
        .unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.avatar, "");
        assert!(user.is_admin);

        // Cached copies round-trip through storage.
        let cached = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&cached).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_hashtag_list() {
        let post: Post = serde_json::from_str(
            r##"{"id":1,"title":"t","content":"<p>x</p>","hashtags":"#rust, tokio ,,#web"}"##,
        )
        .unwrap();
        assert_eq!(post.hashtag_list(), vec!["rust", "tokio", "web"]);
        assert_eq!(post.like_count, 0);
        assert_eq!(post.view_count, None);
    }

    #[test]
    fn test_presence() {
        let mut user: ChatUser =
            serde_json::from_str(r#"{"id":2,"username":"bek","is_online":1}"#).unwrap();
        assert_eq!(user.presence(), Presence::Online);

        user.is_online = false;
        assert_eq!(user.presence(), Presence::Offline);

        user.last_seen = Some("2024-05-01 10:00:00".to_string());
        assert_eq!(
            user.presence(),
            Presence::LastSeen("2024-05-01 10:00:00".to_string())
        );
    }

    #[test]
    fn test_profile_apply_patch() {
        let mut profile: Profile = serde_json::from_str(
            r#"{"id":3,"username":"zara","bio":"old","location":"Tashkent","post_count":"4"}"#,
        )
        .unwrap();
        assert_eq!(profile.post_count, 4);

        let patch: ProfilePatch =
            serde_json::from_str(r#"{"bio":"new","avatar":"avatars/3.png"}"#).unwrap();
        profile.apply(&patch);

        assert_eq!(profile.bio, "new");
        assert_eq!(profile.avatar, "avatars/3.png");
        assert_eq!(profile.location.as_deref(), Some("Tashkent"));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-05-01 10:00:00").unwrap();
        let b = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let c = parse_timestamp("2024-05-01T10:00:00.500Z").unwrap();
        assert_eq!(a, b);
        assert!(c > b);
        assert!(parse_timestamp("yesterday").is_none());
    }
}

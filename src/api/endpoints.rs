use reqwest::Method;

/// Where an endpoint expects the session token.
///
/// The backend is not uniform about this, so the table below is the single
/// place that knows which endpoint reads the token from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>`
    Header,
    /// `&token=<token>` in the query string.
    Query,
    /// `"token"` field in the JSON body.
    Body,
    None,
}

/// Actions served by `api.php`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Posts,
    Post,
    View,
    Login,
    Register,
    VerifyEmail,
    Like,
    UserLikes,
    Comments,
    CreateComment,
    ChatUsers,
    ChatMessages,
    SendMessage,
    Heartbeat,
    OnlineStatus,
    Profile,
    UpdateProfile,
    NewsletterSubscribe,
    Contact,
}

impl Endpoint {
    #[must_use]
    pub fn action(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Post => "post",
            Self::View => "view",
            Self::Login => "login",
            Self::Register => "register",
            Self::VerifyEmail => "verify-email",
            Self::Like => "like",
            Self::UserLikes => "get-user-likes",
            Self::Comments | Self::CreateComment => "comments",
            Self::ChatUsers => "chat-users",
            Self::ChatMessages => "chat-messages",
            Self::SendMessage => "send-message",
            Self::Heartbeat => "heartbeat",
            Self::OnlineStatus => "online-status",
            Self::Profile => "profile",
            Self::UpdateProfile => "update-profile",
            Self::NewsletterSubscribe => "newsletter-subscribe",
            Self::Contact => "contact",
        }
    }

    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::Posts
            | Self::Post
            | Self::UserLikes
            | Self::Comments
            | Self::ChatUsers
            | Self::ChatMessages
            | Self::OnlineStatus
            | Self::Profile => Method::GET,
            Self::View
            | Self::Login
            | Self::Register
            | Self::VerifyEmail
            | Self::Like
            | Self::CreateComment
            | Self::SendMessage
            | Self::Heartbeat
            | Self::UpdateProfile
            | Self::NewsletterSubscribe
            | Self::Contact => Method::POST,
        }
    }

    #[must_use]
    pub fn token_placement(self) -> TokenPlacement {
        match self {
            Self::SendMessage | Self::Heartbeat | Self::UpdateProfile => TokenPlacement::Header,
            Self::UserLikes | Self::ChatUsers | Self::ChatMessages => TokenPlacement::Query,
            Self::Like | Self::CreateComment => TokenPlacement::Body,
            Self::Posts
            | Self::Post
            | Self::View
            | Self::Login
            | Self::Register
            | Self::VerifyEmail
            | Self::Comments
            | Self::OnlineStatus
            | Self::Profile
            | Self::NewsletterSubscribe
            | Self::Contact => TokenPlacement::None,
        }
    }
}

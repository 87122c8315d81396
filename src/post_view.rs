//! Single post page.

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::ClientError;
use crate::i18n::Text;
use crate::models::{Comment, Post};
use crate::pagination::{append_unique, Pager};

/// Post id from a `postid=<n>` query string, defaulting to the first post.
#[must_use]
pub fn post_id_from_query(query: &str) -> i64 {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "postid")
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(1)
}

pub struct PostView {
    ctx: Context,
    post_id: i64,
    post: Option<Post>,
    error: Option<String>,
    liked: bool,
    bookmarked: bool,
    comments: Vec<Comment>,
    comments_pager: Pager,
}

impl PostView {
    pub fn new(ctx: Context, post_id: i64) -> Self {
        let comments_pager = Pager::new(ctx.config.comments_page_size);
        Self {
            ctx,
            post_id,
            post: None,
            error: None,
            liked: false,
            bookmarked: false,
            comments: Vec::new(),
            comments_pager,
        }
    }

    /// Load the post, hydrate liked and bookmark state, bump the view counter
    /// and load the first page of comments.
    ///
    /// A missing post puts the page into its error state rather than queuing
    /// a notice.
    pub async fn open(&mut self) {
        self.error = None;
        match self.ctx.api.post(self.post_id).await {
            Ok(post) => {
                debug!(post_id = self.post_id, title = %post.title, "Post loaded");
                self.post = Some(post);
            }
            Err(e) => {
                warn!(post_id = self.post_id, "Failed to load post: {e}");
                let err = ClientError::from(e);
                self.error = Some(
                    err.server_message()
                        .unwrap_or(self.ctx.text(Text::PostNotFound))
                        .to_string(),
                );
                return;
            }
        }

        self.hydrate_liked().await;
        self.bookmarked = self.ctx.prefs.is_bookmarked(self.post_id);

        if let Err(e) = self.ctx.api.increment_view(self.post_id).await {
            warn!(post_id = self.post_id, "Failed to count view: {e}");
        }

        if let Err(e) = self.load_comments(false).await {
            warn!(post_id = self.post_id, "Failed to load comments: {e}");
        }
    }

    /// Prefer the server's liked list; fall back to the stored one.
    async fn hydrate_liked(&mut self) {
        if let Some(token) = self.ctx.session.token() {
            match self.ctx.api.user_likes(&token).await {
                Ok(ids) => {
                    self.liked = ids.contains(&self.post_id);
                    return;
                }
                Err(e) => debug!("Falling back to stored likes: {e}"),
            }
        }
        self.liked = self.ctx.prefs.is_liked(self.post_id);
    }

    #[must_use]
    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_liked(&self) -> bool {
        self.liked
    }

    #[must_use]
    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    #[must_use]
    pub fn has_more_comments(&self) -> bool {
        self.comments_pager.has_more()
    }

    /// Link for the share dialog.
    #[must_use]
    pub fn share_url(&self) -> String {
        format!(
            "{}/posts/?postid={}",
            self.ctx.config.site_origin.trim_end_matches('/'),
            self.post_id
        )
    }

    /// # Errors
    ///
    /// Returns the API failure; comment paging failures are only logged.
    pub async fn load_comments(&mut self, append: bool) -> Result<usize, ClientError> {
        let offset = if append {
            self.comments_pager.next_offset()
        } else {
            0
        };
        let limit = self.comments_pager.limit();
        let comments = self
            .ctx
            .api
            .comments(self.post_id, Some((limit, offset)))
            .await?;

        let fetched = comments.len();
        let added = if append {
            append_unique(&mut self.comments, comments)
        } else {
            self.comments = comments;
            fetched
        };
        self.comments_pager.advance(offset, fetched);
        Ok(added)
    }

    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn load_more_comments(&mut self) -> Result<usize, ClientError> {
        self.load_comments(true).await
    }

    /// Toggle the like; returns whether the post is now liked.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] (after an info notice) when
    /// logged out, or the API failure after an error notice.
    pub async fn toggle_like(&mut self) -> Result<bool, ClientError> {
        let Some(token) = self.ctx.session.token() else {
            self.ctx.notifier.info(self.ctx.text(Text::LoginRequired));
            return Err(ClientError::NotAuthenticated);
        };

        let like_count = match self.ctx.api.toggle_like(&token, self.post_id).await {
            Ok(count) => count,
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("like", &err, Text::LikeFailed);
                return Err(err);
            }
        };

        if let (Some(count), Some(post)) = (like_count, self.post.as_mut()) {
            post.like_count = count;
        }
        self.liked = !self.liked;
        if let Err(e) = self.ctx.prefs.set_liked(self.post_id, self.liked) {
            warn!(post_id = self.post_id, "Failed to persist liked state: {e}");
        }
        Ok(self.liked)
    }

    /// Local-only bookmark toggle.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn toggle_bookmark(&mut self) -> Result<bool, ClientError> {
        self.bookmarked = self.ctx.prefs.toggle_bookmark(self.post_id)?;
        Ok(self.bookmarked)
    }

    /// Add a comment: counter first, then reload the comment list.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn add_comment(&mut self, content: &str) -> Result<bool, ClientError> {
        let content = content.trim();
        let Some(token) = self.ctx.session.token() else {
            return Ok(false);
        };
        if content.is_empty() {
            return Ok(false);
        }

        if let Err(e) = self
            .ctx
            .api
            .create_comment(&token, self.post_id, content)
            .await
        {
            let err = ClientError::from(e);
            self.ctx.report("comment", &err, Text::CommentFailed);
            return Err(err);
        }

        if let Some(post) = self.post.as_mut() {
            post.comment_count += 1;
        }
        if let Err(e) = self.load_comments(false).await {
            warn!(post_id = self.post_id, "Failed to reload comments: {e}");
        }
        Ok(true)
    }
}

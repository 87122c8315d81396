//! Home page feed: searchable post list with likes and inline comments.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::ClientError;
use crate::i18n::Text;
use crate::models::{Comment, Post};
use crate::pagination::{append_unique, Pager};

pub struct Feed {
    ctx: Context,
    posts: Vec<Post>,
    pager: Pager,
    search: String,
    liked: HashSet<i64>,
    comments: Option<(i64, Vec<Comment>)>,
}

impl Feed {
    /// An empty feed; liked state starts from the stored list.
    pub fn new(ctx: Context) -> Self {
        let pager = Pager::new(ctx.config.posts_page_size);
        let liked = ctx.prefs.liked_posts().into_iter().collect();
        Self {
            ctx,
            posts: Vec::new(),
            pager,
            search: String::new(),
            liked,
            comments: None,
        }
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn search_query(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pager.has_more()
    }

    /// Load the first page for the current search, replacing the list.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice; the list is left as it was.
    pub async fn load(&mut self) -> Result<usize, ClientError> {
        let query = self.search.clone();
        self.fetch_page(&query, 0, false).await
    }

    /// Replace the list with the first page for `query`. The query is kept
    /// only once that page has arrived.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice; the previous query and
    /// list stay in place.
    pub async fn search(&mut self, query: &str) -> Result<usize, ClientError> {
        self.fetch_page(query.trim(), 0, false).await
    }

    /// Search by a hashtag clicked on a post card.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn search_by_category(&mut self, tag: &str) -> Result<usize, ClientError> {
        self.search(tag.trim_start_matches('#')).await
    }

    /// Append the next page. Returns how many new posts were added.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn load_more(&mut self) -> Result<usize, ClientError> {
        let offset = self.pager.next_offset();
        let query = self.search.clone();
        self.fetch_page(&query, offset, true).await
    }

    async fn fetch_page(
        &mut self,
        query: &str,
        offset: u32,
        append: bool,
    ) -> Result<usize, ClientError> {
        let page = self.pager.page_of(offset);
        let limit = self.pager.limit();

        let posts = match self.ctx.api.posts(page, limit, query).await {
            Ok(posts) => posts,
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("load posts", &err, Text::LoadPostsFailed);
                return Err(err);
            }
        };

        let fetched = posts.len();
        let added = if append {
            append_unique(&mut self.posts, posts)
        } else {
            self.posts = posts;
            query.clone_into(&mut self.search);
            fetched
        };
        self.pager.advance(offset, fetched);
        debug!(page, fetched, added, "Posts loaded");
        Ok(added)
    }

    /// Replace the liked set with the server's list. Failures are only logged.
    pub async fn hydrate_likes(&mut self) {
        let Some(token) = self.ctx.session.token() else {
            return;
        };
        match self.ctx.api.user_likes(&token).await {
            Ok(ids) => self.liked = ids.into_iter().collect(),
            Err(e) => warn!("Failed to load user likes: {e}"),
        }
    }

    #[must_use]
    pub fn is_liked(&self, post_id: i64) -> bool {
        self.liked.contains(&post_id)
    }

    /// Toggle a like. The count shown is the server's; the flag flips locally
    /// and is mirrored into storage. Returns whether the post is now liked.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] (after an info notice) when
    /// logged out, or the API failure after an error notice.
    pub async fn toggle_like(&mut self, post_id: i64) -> Result<bool, ClientError> {
        let Some(token) = self.ctx.session.token() else {
            self.ctx.notifier.info(self.ctx.text(Text::LoginRequired));
            return Err(ClientError::NotAuthenticated);
        };

        let like_count = match self.ctx.api.toggle_like(&token, post_id).await {
            Ok(count) => count,
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("like", &err, Text::LikeFailed);
                return Err(err);
            }
        };

        if let (Some(count), Some(post)) =
            (like_count, self.posts.iter_mut().find(|p| p.id == post_id))
        {
            post.like_count = count;
        }

        let liked = if self.liked.remove(&post_id) {
            false
        } else {
            self.liked.insert(post_id);
            true
        };
        if let Err(e) = self.ctx.prefs.set_liked(post_id, liked) {
            warn!(post_id, "Failed to persist liked state: {e}");
        }
        Ok(liked)
    }

    /// Load every comment of one post into the inline comment panel.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn load_comments(&mut self, post_id: i64) -> Result<(), ClientError> {
        match self.ctx.api.comments(post_id, None).await {
            Ok(comments) => {
                self.comments = Some((post_id, comments));
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("load comments", &err, Text::LoadCommentsFailed);
                Err(err)
            }
        }
    }

    /// Post whose comments are open, with its comments.
    #[must_use]
    pub fn comments(&self) -> Option<(i64, &[Comment])> {
        self.comments
            .as_ref()
            .map(|(post_id, comments)| (*post_id, comments.as_slice()))
    }

    /// Add a comment. The post's counter goes up at once; the comment list is
    /// reloaded from the server. Blank input or a logged-out user is a no-op
    /// returning `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn add_comment(&mut self, post_id: i64, content: &str) -> Result<bool, ClientError> {
        let content = content.trim();
        let Some(token) = self.ctx.session.token() else {
            return Ok(false);
        };
        if content.is_empty() {
            return Ok(false);
        }

        if let Err(e) = self.ctx.api.create_comment(&token, post_id, content).await {
            let err = ClientError::from(e);
            self.ctx.report("comment", &err, Text::CommentFailed);
            return Err(err);
        }

        if let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_count += 1;
        }
        // The reload reports its own failure.
        let _ = self.load_comments(post_id).await;
        Ok(true)
    }

    /// Log out and forget liked state.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be cleared.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.liked.clear();
        self.ctx.session.logout()?;
        Ok(())
    }
}

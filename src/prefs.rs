use std::sync::Arc;

use crate::i18n::Lang;
use crate::storage::{get_json, keys, set_json, Storage, StorageError};

/// Per-browser preferences kept in storage: liked and bookmarked post ids,
/// the last profile viewed and the UI language.
#[derive(Clone)]
pub struct Preferences {
    storage: Arc<dyn Storage>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn ids(&self, key: &str) -> Vec<i64> {
        get_json(self.storage.as_ref(), key).unwrap_or_default()
    }

    fn set_member(&self, key: &str, id: i64, present: bool) -> Result<(), StorageError> {
        let mut ids = self.ids(key);
        let contained = ids.contains(&id);
        if present && !contained {
            ids.push(id);
        } else if !present && contained {
            ids.retain(|&i| i != id);
        } else {
            return Ok(());
        }
        set_json(self.storage.as_ref(), key, &ids)
    }

    #[must_use]
    pub fn liked_posts(&self) -> Vec<i64> {
        self.ids(keys::LIKED_POSTS)
    }

    #[must_use]
    pub fn is_liked(&self, post_id: i64) -> bool {
        self.liked_posts().contains(&post_id)
    }

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set_liked(&self, post_id: i64, liked: bool) -> Result<(), StorageError> {
        self.set_member(keys::LIKED_POSTS, post_id, liked)
    }

    #[must_use]
    pub fn bookmarked_posts(&self) -> Vec<i64> {
        self.ids(keys::BOOKMARKED_POSTS)
    }

    #[must_use]
    pub fn is_bookmarked(&self, post_id: i64) -> bool {
        self.bookmarked_posts().contains(&post_id)
    }

    /// Flip a bookmark; returns whether the post is now bookmarked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn toggle_bookmark(&self, post_id: i64) -> Result<bool, StorageError> {
        let now = !self.is_bookmarked(post_id);
        self.set_member(keys::BOOKMARKED_POSTS, post_id, now)?;
        Ok(now)
    }

    #[must_use]
    pub fn last_profile(&self) -> Option<String> {
        self.storage
            .get(keys::LAST_PROFILE)
            .filter(|name| !name.trim().is_empty())
    }

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set_last_profile(&self, username: &str) -> Result<(), StorageError> {
        self.storage.set(keys::LAST_PROFILE, username)
    }

    /// Saved language, falling back to Uzbek.
    #[must_use]
    pub fn language(&self) -> Lang {
        self.storage
            .get(keys::LANGUAGE)
            .and_then(|code| Lang::from_code(&code))
            .unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set_language(&self, lang: Lang) -> Result<(), StorageError> {
        self.storage.set(keys::LANGUAGE, lang.code())
    }
}

//! Session holder: the auth token and cached user kept in storage.
//!
//! There is no expiry or refresh on the client. A stale token shows up as
//! failed API calls.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::ClientError;
use crate::models::User;
use crate::storage::{keys, set_json, Storage, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Shared view of who is logged in. Clones share state.
#[derive(Clone)]
pub struct SessionHolder {
    storage: Arc<dyn Storage>,
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionHolder {
    /// Create a holder and load any stored session.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let holder = Self {
            storage,
            current: Arc::new(RwLock::new(None)),
        };
        holder.load();
        holder
    }

    /// Re-read the session from storage.
    pub fn load(&self) -> Option<Session> {
        let session = self.read_stored();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session.clone();
        session
    }

    fn read_stored(&self) -> Option<Session> {
        let token = self.storage.get(keys::TOKEN).filter(|t| !t.is_empty())?;
        let raw_user = self.storage.get(keys::USER)?;
        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some(Session { token, user }),
            Err(e) => {
                warn!("Cached user is unreadable, treating as logged out: {e}");
                None
            }
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current().map(|s| s.user)
    }

    /// The session, or [`ClientError::NotAuthenticated`].
    ///
    /// # Errors
    ///
    /// Returns an error when nobody is logged in.
    pub fn require(&self) -> Result<Session, ClientError> {
        self.current().ok_or(ClientError::NotAuthenticated)
    }

    /// Persist a freshly issued token and user.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn store(&self, token: &str, user: &User) -> Result<Session, StorageError> {
        self.storage.set(keys::TOKEN, token)?;
        set_json(self.storage.as_ref(), keys::USER, user)?;
        let session = Session {
            token: token.to_string(),
            user: user.clone(),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        info!(user_id = user.id, username = %user.username, "Logged in");
        Ok(session)
    }

    /// Forget the token, cached user and liked-post list.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written. In-memory state is
    /// cleared either way.
    pub fn logout(&self) -> Result<(), StorageError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.storage.remove(keys::TOKEN)?;
        self.storage.remove(keys::USER)?;
        self.storage.remove(keys::LIKED_POSTS)?;
        info!("Logged out");
        Ok(())
    }
}

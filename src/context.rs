use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ClientError;
use crate::i18n::{Lang, Text};
use crate::notify::Notifier;
use crate::prefs::Preferences;
use crate::session::SessionHolder;
use crate::storage::Storage;

/// Everything a view needs: the API, the session, stored preferences and the
/// notice queue. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub api: ApiClient,
    pub session: SessionHolder,
    pub prefs: Preferences,
    pub notifier: Notifier,
}

impl Context {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            api,
            session: SessionHolder::new(storage.clone()),
            prefs: Preferences::new(storage),
            notifier: Notifier::new(),
        })
    }

    #[must_use]
    pub fn lang(&self) -> Lang {
        self.prefs.language()
    }

    #[must_use]
    pub fn text(&self, text: Text) -> &'static str {
        text.get(self.lang())
    }

    /// Queue one error notice for a failed action.
    pub fn report(&self, action: &str, err: &ClientError, fallback: Text) {
        self.notifier.report(action, err, self.text(fallback));
    }
}

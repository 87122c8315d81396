//! Profile page: view any user, edit your own.

use tracing::{debug, warn};

use crate::api::ProfileUpdate;
use crate::context::Context;
use crate::error::ClientError;
use crate::i18n::Text;
use crate::models::Profile;

pub struct ProfileView {
    ctx: Context,
    username: Option<String>,
    profile: Option<Profile>,
    online: bool,
    error: Option<String>,
}

impl ProfileView {
    /// A view for `username`, or for the last profile visited when `None`.
    pub fn new(ctx: Context, username: Option<&str>) -> Self {
        let username = username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .or_else(|| ctx.prefs.last_profile());
        Self {
            ctx,
            username,
            profile: None,
            online: false,
            error: None,
        }
    }

    /// Load the profile and its online flag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingUsername`] when there is no username to
    /// show. Load failures put the page into its error state instead.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        self.error = None;
        let Some(username) = self.username.clone() else {
            self.error = Some(self.ctx.text(Text::UsernameMissing).to_string());
            return Err(ClientError::MissingUsername);
        };

        if let Err(e) = self.ctx.prefs.set_last_profile(&username) {
            warn!(%username, "Failed to remember last profile: {e}");
        }

        match self.ctx.api.profile(&username).await {
            Ok(profile) => {
                debug!(%username, "Profile loaded");
                self.profile = Some(profile);
            }
            Err(e) => {
                warn!(%username, "Failed to load profile: {e}");
                let err = ClientError::from(e);
                self.error = Some(
                    err.server_message()
                        .unwrap_or(self.ctx.text(Text::ProfileNotFound))
                        .to_string(),
                );
                return Ok(());
            }
        }

        match self.ctx.api.online_status(&username).await {
            Ok(online) => self.online = online,
            Err(e) => debug!(%username, "Online status unavailable: {e}"),
        }
        Ok(())
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_own_profile(&self) -> bool {
        match (self.ctx.session.user(), &self.profile) {
            (Some(user), Some(profile)) => user.id == profile.id,
            _ => false,
        }
    }

    /// The edit form pre-filled from the loaded profile.
    #[must_use]
    pub fn edit_form(&self) -> Option<ProfileUpdate> {
        self.profile.as_ref().map(|profile| ProfileUpdate {
            bio: profile.bio.clone(),
            location: profile.location.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
            avatar: None,
        })
    }

    /// Submit the edit form and merge the server's echo into the profile.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] when logged out, or the API
    /// failure after an error notice.
    pub async fn update(&mut self, form: ProfileUpdate) -> Result<(), ClientError> {
        let session = self.ctx.session.require()?;
        if self.profile.is_none() {
            return Ok(());
        }

        match self.ctx.api.update_profile(&session.token, form).await {
            Ok(reply) => {
                if let (Some(profile), Some(patch)) = (self.profile.as_mut(), reply.data) {
                    profile.apply(&patch);
                }
                self.ctx.notifier.success(self.ctx.text(Text::ProfileUpdated));
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("update profile", &err, Text::GenericError);
                Err(err)
            }
        }
    }

    /// Gate for the "message" button: chat needs a session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] after an info notice.
    pub fn start_chat(&self) -> Result<(), ClientError> {
        if self.ctx.session.is_authenticated() {
            Ok(())
        } else {
            self.ctx.notifier.info(self.ctx.text(Text::LoginRequired));
            Err(ClientError::NotAuthenticated)
        }
    }
}

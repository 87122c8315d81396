//! Login, registration, email verification, newsletter and contact forms.
//!
//! Each form shows the server's message on success or failure, falling back
//! to a local text when the server sends none.

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::api::{ContactForm, LoginForm, RegisterForm};
use crate::context::Context;
use crate::error::ClientError;
use crate::i18n::Text;
use crate::models::User;

/// A captcha image and the URL it was fetched from.
#[derive(Debug, Clone)]
pub struct Captcha {
    pub url: String,
    pub image: Bytes,
}

pub struct Account {
    ctx: Context,
}

impl Account {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Fetch a new captcha. Every form refreshes it after a submit.
    ///
    /// # Errors
    ///
    /// Returns the API failure; it is only logged.
    pub async fn captcha(&self) -> Result<Captcha, ClientError> {
        let stamp = Utc::now().timestamp_millis();
        let image = self.ctx.api.captcha(stamp).await?;
        Ok(Captcha {
            url: self.ctx.api.captcha_url(stamp),
            image,
        })
    }

    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn login(&self, form: &LoginForm) -> Result<User, ClientError> {
        let reply = match self.ctx.api.login(form).await {
            Ok(reply) => reply,
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("login", &err, Text::LoginFailed);
                return Err(err);
            }
        };

        let (token, user) = reply.data;
        self.ctx.session.store(&token, &user)?;
        if let Some(message) = reply.message {
            self.ctx.notifier.success(message);
        }
        Ok(user)
    }

    /// Register; on success the caller moves on to email verification.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn register(&self, form: &RegisterForm) -> Result<(), ClientError> {
        match self.ctx.api.register(form).await {
            Ok(message) => {
                info!(username = %form.username, "Registration submitted");
                if let Some(message) = message {
                    self.ctx.notifier.success(message);
                }
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("register", &err, Text::RegisterFailed);
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn verify_email(&self, code: &str) -> Result<(), ClientError> {
        match self.ctx.api.verify_email(code.trim()).await {
            Ok(_) => {
                self.ctx
                    .notifier
                    .success(self.ctx.text(Text::RegistrationComplete));
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("verify email", &err, Text::VerifyFailed);
                Err(err)
            }
        }
    }

    /// Blank email or captcha is a no-op returning `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn subscribe_newsletter(&self, email: &str, captcha: &str) -> Result<bool, ClientError> {
        let (email, captcha) = (email.trim(), captcha.trim());
        if email.is_empty() || captcha.is_empty() {
            return Ok(false);
        }
        match self.ctx.api.newsletter_subscribe(email, captcha).await {
            Ok(message) => {
                if let Some(message) = message {
                    self.ctx.notifier.success(message);
                }
                Ok(true)
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("newsletter", &err, Text::NewsletterFailed);
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// Returns the failure after queuing a notice.
    pub async fn send_contact(&self, form: &ContactForm) -> Result<(), ClientError> {
        match self.ctx.api.contact(form).await {
            Ok(_) => {
                self.ctx.notifier.success(self.ctx.text(Text::ContactSent));
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                self.ctx.report("contact", &err, Text::ContactFailed);
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if storage cannot be cleared.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.ctx.session.logout()?;
        Ok(())
    }
}

//! Transient, dismissible notices (the site's alert banner).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Shared queue of notices waiting to be shown.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    queue: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Notice>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        debug!(?kind, %message, "Notice");
        self.queue().push_back(Notice { kind, message });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeKind::Info, message);
    }

    /// Log a failed user action and queue one error notice for it.
    ///
    /// The server's own message wins over `fallback` when it sent one.
    pub fn report(&self, action: &str, err: &ClientError, fallback: &str) {
        warn!(action, "Action failed: {err}");
        let message = err.server_message().unwrap_or(fallback).to_string();
        self.error(message);
    }

    /// The notice currently on screen.
    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        self.queue().front().cloned()
    }

    pub fn dismiss(&self) -> Option<Notice> {
        self.queue().pop_front()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.queue().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    #[test]
    fn test_queue_order_and_dismiss() {
        let notifier = Notifier::new();
        notifier.info("one");
        notifier.success("two");

        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.current().unwrap().message, "one");
        assert_eq!(notifier.dismiss().unwrap().kind, NoticeKind::Info);
        assert_eq!(notifier.current().unwrap().kind, NoticeKind::Success);
        assert_eq!(notifier.drain().len(), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_report_prefers_server_message() {
        let notifier = Notifier::new();
        let rejected = ClientError::Api(ApiError::Rejected {
            message: "Captcha noto'g'ri".to_string(),
        });
        notifier.report("login", &rejected, "fallback");

        let blank = ClientError::Api(ApiError::Rejected {
            message: String::new(),
        });
        notifier.report("login", &blank, "fallback");

        let notices = notifier.drain();
        assert_eq!(notices[0].message, "Captcha noto'g'ri");
        assert_eq!(notices[1].message, "fallback");
        assert!(notices.iter().all(|n| n.kind == NoticeKind::Error));
    }

    #[test]
    fn test_clones_share_queue() {
        let notifier = Notifier::new();
        let other = notifier.clone();
        other.error("boom");
        assert_eq!(notifier.len(), 1);
    }
}

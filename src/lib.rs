//! Blog client library.
//!
//! A typed client for the StackNest blog API together with the view state the
//! web front end keeps: the post feed, post and profile pages, account forms,
//! and a polling chat that stays in sync with the server.

pub mod account;
pub mod api;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod i18n;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod post_view;
pub mod prefs;
pub mod profile;
pub mod session;
pub mod storage;

pub use context::Context;
pub use error::ClientError;

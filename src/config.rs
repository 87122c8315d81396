use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default API base used by the production site.
pub const DEFAULT_API_BASE_URL: &str = "https://stacknest.site/blogpost/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote API
    pub api_base_url: String,
    pub site_origin: String,
    pub http_timeout: Duration,

    // Local storage
    pub storage_path: PathBuf,

    // Chat polling
    pub heartbeat_interval: Duration,
    pub chat_users_interval: Duration,
    pub chat_messages_interval: Duration,
    pub chat_page_size: u32,
    pub chat_poll_limit: u32,
    pub chat_partner: Option<String>,

    // Listing
    pub posts_page_size: u32,
    pub comments_page_size: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Remote API
            api_base_url: env_or_default("API_BASE_URL", DEFAULT_API_BASE_URL),
            site_origin: env_or_default("SITE_ORIGIN", "https://stacknest.site"),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),

            // Local storage
            storage_path: PathBuf::from(env_or_default(
                "STORAGE_PATH",
                "./data/local-storage.json",
            )),

            // Chat polling
            heartbeat_interval: Duration::from_secs(parse_env_u64("HEARTBEAT_INTERVAL_SECS", 60)?),
            chat_users_interval: Duration::from_secs(parse_env_u64("CHAT_USERS_INTERVAL_SECS", 5)?),
            chat_messages_interval: Duration::from_secs(parse_env_u64(
                "CHAT_MESSAGES_INTERVAL_SECS",
                3,
            )?),
            chat_page_size: parse_env_u32("CHAT_PAGE_SIZE", 30)?,
            chat_poll_limit: parse_env_u32("CHAT_POLL_LIMIT", 50)?,
            chat_partner: optional_env("CHAT_PARTNER"),

            // Listing
            posts_page_size: parse_env_u32("POSTS_PAGE_SIZE", 10)?,
            comments_page_size: parse_env_u32("COMMENTS_PAGE_SIZE", 30)?,
        })
    }

    /// Configuration pointing at a local test server, with short poll intervals.
    #[must_use]
    pub fn for_testing(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            site_origin: "http://localhost:3000".to_string(),
            http_timeout: Duration::from_secs(5),
            storage_path: PathBuf::from("./data/test-storage.json"),
            heartbeat_interval: Duration::from_millis(200),
            chat_users_interval: Duration::from_millis(100),
            chat_messages_interval: Duration::from_millis(100),
            chat_page_size: 30,
            chat_poll_limit: 50,
            chat_partner: None,
            posts_page_size: 10,
            comments_page_size: 30,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "API_BASE_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.api_base_url),
            });
        }
        for (name, interval) in [
            ("HEARTBEAT_INTERVAL_SECS", self.heartbeat_interval),
            ("CHAT_USERS_INTERVAL_SECS", self.chat_users_interval),
            ("CHAT_MESSAGES_INTERVAL_SECS", self.chat_messages_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }
        for (name, size) in [
            ("CHAT_PAGE_SIZE", self.chat_page_size),
            ("CHAT_POLL_LIMIT", self.chat_poll_limit),
            ("POSTS_PAGE_SIZE", self.posts_page_size),
            ("COMMENTS_PAGE_SIZE", self.comments_page_size),
        ] {
            if size == 0 {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        std::env::remove_var("API_BASE_URL");
        std::env::remove_var("CHAT_MESSAGES_INTERVAL_SECS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(60));
        assert_eq!(config.chat_users_interval, Duration::from_secs(5));
        assert_eq!(config.chat_messages_interval, Duration::from_secs(3));
        assert_eq!(config.chat_page_size, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_parse_int_error() {
        std::env::set_var("CHAT_MESSAGES_INTERVAL_SECS", "soon");
        let result = Config::from_env();
        std::env::remove_var("CHAT_MESSAGES_INTERVAL_SECS");
        assert!(matches!(result, Err(ConfigError::ParseInt { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::for_testing("http://localhost:1");
        config.posts_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config::for_testing("not a url");
        assert!(config.validate().is_err());
    }
}

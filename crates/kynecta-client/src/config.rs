//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration for local development.

use std::path::PathBuf;

use kynecta_shared::constants::{
    DEFAULT_API_URL, DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_SEND_ATTEMPTS,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Kynecta HTTP backend.
    /// Env: `KYNECTA_API_URL`
    /// Default: `http://localhost:8080`
    pub api_base_url: String,

    /// Directory holding the local database.  When unset, the
    /// platform-appropriate data directory is used.
    /// Env: `KYNECTA_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// Delivery attempts allowed per queued message before it is dropped.
    /// Env: `KYNECTA_MAX_SEND_ATTEMPTS`
    /// Default: `5`
    pub max_send_attempts: u32,

    /// Capacity of the client event channel.
    /// Env: `KYNECTA_EVENT_CAPACITY`
    /// Default: `256`
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("KYNECTA_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }

        if let Ok(dir) = std::env::var("KYNECTA_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(val) = std::env::var("KYNECTA_MAX_SEND_ATTEMPTS") {
            match parse_positive(&val) {
                Some(n) => config.max_send_attempts = n,
                None => {
                    tracing::warn!(
                        value = %val,
                        "Invalid KYNECTA_MAX_SEND_ATTEMPTS, using default"
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("KYNECTA_EVENT_CAPACITY") {
            match parse_positive(&val) {
                Some(n) => config.event_capacity = n as usize,
                None => {
                    tracing::warn!(
                        value = %val,
                        "Invalid KYNECTA_EVENT_CAPACITY, using default"
                    );
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a strictly positive integer; zero would disable the mechanism it
/// configures, so it is rejected alongside garbage.
fn parse_positive(val: &str) -> Option<u32> {
    match val.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.data_dir, None);
        assert_eq!(config.max_send_attempts, DEFAULT_MAX_SEND_ATTEMPTS);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("3"), Some(3));
        assert_eq!(parse_positive(" 10 "), Some(10));
        assert_eq!(parse_positive("0"), None);
        assert_eq!(parse_positive("-1"), None);
        assert_eq!(parse_positive("many"), None);
    }
}

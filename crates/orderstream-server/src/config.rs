//! Server configuration.

use crate::error::ServerError;
use crate::registry::DEFAULT_SESSION_BUFFER;
use orderstream_core::store::DEFAULT_FEED_CAPACITY;

/// Configuration for an OrderStream server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`.
    pub bind_addr: String,
    /// Capacity of the store's change-feed ring.
    pub feed_capacity: usize,
    /// Per-session send buffer, in messages. A session whose buffer
    /// fills is dropped and unregistered.
    pub session_buffer: usize,
    /// CORS origin to allow; `None` allows any origin.
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            session_buffer: DEFAULT_SESSION_BUFFER,
            allowed_origin: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `ORDERSTREAM_*` environment variables,
    /// falling back to defaults for unset values.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when a set variable fails to parse.
    pub fn from_env() -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("ORDERSTREAM_BIND") {
            config.bind_addr = bind;
        }
        if let Ok(raw) = std::env::var("ORDERSTREAM_FEED_CAPACITY") {
            config.feed_capacity = parse_positive("ORDERSTREAM_FEED_CAPACITY", &raw)?;
        }
        if let Ok(raw) = std::env::var("ORDERSTREAM_SESSION_BUFFER") {
            config.session_buffer = parse_positive("ORDERSTREAM_SESSION_BUFFER", &raw)?;
        }
        if let Ok(origin) = std::env::var("ORDERSTREAM_ALLOWED_ORIGIN") {
            if !origin.is_empty() {
                config.allowed_origin = Some(origin);
            }
        }

        Ok(config)
    }
}

fn parse_positive(var: &str, raw: &str) -> Result<usize, ServerError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ServerError::Config(format!(
            "{var} must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.feed_capacity, DEFAULT_FEED_CAPACITY);
        assert!(config.allowed_origin.is_none());
    }

    #[test]
    fn test_parse_positive_rejects_junk() {
        assert!(parse_positive("X", "abc").is_err());
        assert!(parse_positive("X", "0").is_err());
        assert!(parse_positive("X", "-4").is_err());
        assert_eq!(parse_positive("X", "16").unwrap(), 16);
    }
}

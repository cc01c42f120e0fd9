//! Application configuration loaded from environment variables.

use saga::TransferConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `REQUIRE_APPROVAL` — gate every transfer on approval (default: off)
/// - `ADVANCED_VISIBILITY` — publish step names per transfer (default: off)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub require_approval: bool,
    pub advanced_visibility: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            require_approval: env_flag("REQUIRE_APPROVAL"),
            advanced_visibility: env_flag("ADVANCED_VISIBILITY"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the server-wide transfer configuration.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            require_approval: self.require_approval,
            advanced_visibility: self.advanced_visibility,
            ..TransferConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            require_approval: false,
            advanced_visibility: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

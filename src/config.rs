//! Runtime configuration read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Settings of the tournament coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Longest wait for a per-match or per-tournament lock.
    pub lock_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

/// Web server configuration.
///
/// Environment variables:
/// - `HOST`: bind address (default: 0.0.0.0)
/// - `PORT`: bind port (default: 8080)
/// - `LOCK_TIMEOUT_MS`: lock wait in milliseconds (default: 5000)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub coordinator: CoordinatorConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080),
            coordinator: CoordinatorConfig {
                lock_timeout: Duration::from_millis(parse_var(
                    "LOCK_TIMEOUT_MS",
                    DEFAULT_LOCK_TIMEOUT_MS,
                )),
            },
        }
    }
}

/// Parse an env var, falling back to `default` when unset or invalid.
fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

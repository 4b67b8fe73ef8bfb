//! Server configuration
//!
//! # Environment variables
//!
//! Every setting can be overridden through the environment:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/portal-server | Working directory (store file, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | TIMEZONE | UTC | Business timezone (IANA name) |
//! | EDIT_WINDOW_HOURS | 2 | Customer edit window after ordering |
//! | SURREAL_ENDPOINT | (unset) | Document engine `host:port`; unset runs fallback-only |
//! | SURREAL_NS | portal | Document engine namespace |
//! | SURREAL_DB | orders | Document engine database |
//! | SURREAL_USER / SURREAL_PASS | (unset) | Root credentials, both or neither |
//! | CONNECT_TIMEOUT_SECS | 5 | Document engine dial timeout |
//! | QUERY_TIMEOUT_SECS | 10 | Document engine per-query timeout |
//! | REQUEST_TIMEOUT_MS | 30000 | HTTP request timeout |
//! | BOOTSTRAP_FILE | (unset) | JSON seed for the fallback catalog |
//!
//! # Example
//!
//! ```ignore
//! WORK_DIR=/data/portal SURREAL_ENDPOINT=db.internal:8000 cargo run
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::db::SurrealConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the fallback store file and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Business timezone; day-scoped order numbers and report buckets
    /// follow it
    pub timezone: Tz,
    /// Hours a customer may still edit an order after placing it
    pub edit_window_hours: i64,

    // === Primary store ===
    /// Document engine endpoint (`host:port`); None runs fallback-only
    pub surreal_endpoint: Option<String>,
    pub surreal_namespace: String,
    pub surreal_database: String,
    pub surreal_username: Option<String>,
    pub surreal_password: Option<String>,
    /// Dial timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Per-query timeout (seconds)
    pub query_timeout_secs: u64,

    /// HTTP request timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// Optional JSON seed for the fallback catalog
    pub bootstrap_file: Option<String>,
}

impl Config {
    /// Load the configuration from the environment, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/portal-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: parse_timezone(std::env::var("TIMEZONE").ok().as_deref()),
            edit_window_hours: std::env::var("EDIT_WINDOW_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),

            surreal_endpoint: std::env::var("SURREAL_ENDPOINT").ok(),
            surreal_namespace: std::env::var("SURREAL_NS").unwrap_or_else(|_| "portal".into()),
            surreal_database: std::env::var("SURREAL_DB").unwrap_or_else(|_| "orders".into()),
            surreal_username: std::env::var("SURREAL_USER").ok(),
            surreal_password: std::env::var("SURREAL_PASS").ok(),
            connect_timeout_secs: std::env::var("CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            query_timeout_secs: std::env::var("QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            bootstrap_file: std::env::var("BOOTSTRAP_FILE").ok(),
        }
    }

    /// Override the parts tests care about
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Path of the fallback store document
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("store").join("orders.json")
    }

    /// Connection settings for the primary engine, when one is configured
    pub fn surreal_config(&self) -> Option<SurrealConfig> {
        self.surreal_endpoint.as_ref().map(|endpoint| SurrealConfig {
            endpoint: endpoint.clone(),
            namespace: self.surreal_namespace.clone(),
            database: self.surreal_database.clone(),
            username: self.surreal_username.clone(),
            password: self.surreal_password.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Parse an IANA timezone name, falling back to UTC with a warning
fn parse_timezone(name: Option<&str>) -> Tz {
    let Some(name) = name else {
        return chrono_tz::UTC;
    };
    name.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown TIMEZONE '{}', falling back to UTC", name);
        chrono_tz::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_timezones_fall_back_to_utc() {
        assert_eq!(parse_timezone(Some("Mars/Olympus")), chrono_tz::UTC);
        assert_eq!(parse_timezone(None), chrono_tz::UTC);
        assert_eq!(
            parse_timezone(Some("Asia/Dubai")),
            chrono_tz::Asia::Dubai
        );
    }
}

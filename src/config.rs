//! Application configuration loaded from environment variables.
//!
//! - `EXPO_API_URL`: order service REST base (default
//!   `http://localhost:8004/api/v1`)
//! - `EXPO_WS_URL`: order channel base; the restaurant id is appended
//!   (default `ws://localhost:8004/ws/orders`)
//! - `EXPO_CA_CERT`: optional PEM file pinning the backend's CA
//! - `EXPO_FETCH_LIMIT`: snapshot size bound, 1..=500 (default 100)
//! - `EXPO_LOG_FILE`: log destination (default `expo.log`)
//!
//! Timing knobs are not read from the environment; they live in
//! [`SyncSettings`] whose defaults are the production values.

use std::path::PathBuf;
use std::time::Duration;

/// Default REST endpoint of the order service.
const DEFAULT_API_URL: &str = "http://localhost:8004/api/v1";

/// Default order channel endpoint.
const DEFAULT_WS_URL: &str = "ws://localhost:8004/ws/orders";

/// Default number of orders requested per snapshot.
pub const DEFAULT_FETCH_LIMIT: u32 = 100;

/// The backend refuses snapshot limits above this.
const MAX_FETCH_LIMIT: u32 = 500;

const DEFAULT_LOG_FILE: &str = "expo.log";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub log_file: PathBuf,
}

/// Where and how to reach the order service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_url: String,
    pub websocket_url: String,
    pub ca_cert: Option<PathBuf>,
    pub fetch_limit: u32,
}

/// Timing and retry parameters for a subscription.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Interval between liveness probes.
    pub ping_interval: Duration,
    /// Close the channel as dead when nothing arrives for this long.
    pub silence_timeout: Option<Duration>,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Snapshot poll interval for aggregate views.
    pub poll_interval: Duration,
    /// Poll interval for the single-order tracker.
    pub tracker_poll_interval: Duration,
    /// How long a new-order banner stays up before it is acknowledged.
    pub banner_duration: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            silence_timeout: Some(Duration::from_secs(90)),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            poll_interval: Duration::from_secs(30),
            tracker_poll_interval: Duration::from_secs(10),
            banner_duration: Duration::from_secs(12),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`ExpoError::Config`](crate::ExpoError::Config) if a URL has the
/// wrong scheme or `EXPO_FETCH_LIMIT` is not a number in `1..=500`.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let api_url = non_empty_var("EXPO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let websocket_url = non_empty_var("EXPO_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());

    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        return Err(crate::ExpoError::Config(format!(
            "EXPO_API_URL must be an http(s) URL, got {api_url}"
        )));
    }
    if !(websocket_url.starts_with("ws://") || websocket_url.starts_with("wss://")) {
        return Err(crate::ExpoError::Config(format!(
            "EXPO_WS_URL must be a ws(s) URL, got {websocket_url}"
        )));
    }

    let fetch_limit = match non_empty_var("EXPO_FETCH_LIMIT") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=MAX_FETCH_LIMIT).contains(&n) => n,
            _ => {
                return Err(crate::ExpoError::Config(format!(
                    "EXPO_FETCH_LIMIT must be between 1 and {MAX_FETCH_LIMIT}, got {raw}"
                )));
            }
        },
        None => DEFAULT_FETCH_LIMIT,
    };

    Ok(AppConfig {
        backend: BackendConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            websocket_url: websocket_url.trim_end_matches('/').to_string(),
            ca_cert: non_empty_var("EXPO_CA_CERT").map(PathBuf::from),
            fetch_limit,
        },
        log_file: non_empty_var("EXPO_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    /// Serializes every test that touches the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper that temporarily sets env vars, runs `f`, then restores originals.
    ///
    /// Holds [`ENV_LOCK`] for the duration so env-mutating tests in this
    /// module never interleave.
    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let originals: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();

        for (k, v) in vars {
            // SAFETY: ENV_LOCK is held and nothing else in the crate reads these vars from another thread.
            unsafe {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }

        f();

        for (k, original) in originals {
            // SAFETY: restoring original values, same single-threaded context.
            unsafe {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    const ALL_VARS: [&str; 5] = [
        "EXPO_API_URL",
        "EXPO_WS_URL",
        "EXPO_CA_CERT",
        "EXPO_FETCH_LIMIT",
        "EXPO_LOG_FILE",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn defaults_without_env_vars() {
        with_env(&cleared(), || {
            let config = fetch_config().unwrap();
            assert_eq!(config.backend.api_url, DEFAULT_API_URL);
            assert_eq!(config.backend.websocket_url, DEFAULT_WS_URL);
            assert_eq!(config.backend.fetch_limit, DEFAULT_FETCH_LIMIT);
            assert!(config.backend.ca_cert.is_none());
            assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        });
    }

    #[test]
    fn custom_urls_lose_trailing_slash() {
        let mut vars = cleared();
        vars[0].1 = Some("https://orders.example.com/api/v1/");
        vars[1].1 = Some("wss://orders.example.com/ws/orders/");
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.backend.api_url, "https://orders.example.com/api/v1");
            assert_eq!(config.backend.websocket_url, "wss://orders.example.com/ws/orders");
        });
    }

    #[test]
    fn rejects_http_websocket_url() {
        let mut vars = cleared();
        vars[1].1 = Some("http://orders.example.com/ws");
        with_env(&vars, || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("EXPO_WS_URL"));
        });
    }

    #[test]
    fn rejects_out_of_range_limit() {
        for raw in ["0", "501", "many"] {
            let mut vars = cleared();
            vars[3].1 = Some(raw);
            with_env(&vars, || {
                let err = fetch_config().unwrap_err();
                assert!(err.to_string().contains("EXPO_FETCH_LIMIT"), "{raw}");
            });
        }
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let vars: Vec<_> = ALL_VARS.iter().map(|k| (*k, Some(""))).collect();
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.backend.api_url, DEFAULT_API_URL);
            assert!(config.backend.ca_cert.is_none());
        });
    }

    #[test]
    fn default_settings_match_production_timings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.ping_interval, Duration::from_secs(30));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(3));
        assert_eq!(settings.max_reconnect_attempts, 5);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.tracker_poll_interval, Duration::from_secs(10));
    }
}

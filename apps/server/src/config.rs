use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub static_dir: String,
    pub live_poll_interval: Duration,
    pub live_heartbeat: Duration,
    pub search_cache_ttl: Duration,
    pub otp_ttl: Duration,
    pub otp_max_sends: usize,
    pub otp_window: Duration,
    pub sms_webhook_url: Option<String>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            static_dir: "public".to_string(),
            live_poll_interval: Duration::from_secs(15),
            live_heartbeat: Duration::from_secs(20),
            search_cache_ttl: Duration::from_secs(45),
            otp_ttl: Duration::from_secs(300),
            otp_max_sends: 3,
            otp_window: Duration::from_secs(600),
            sms_webhook_url: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Read `TD_*` variables, after loading `.env` if present.
    ///
    /// Malformed values fall back to their defaults; only the listen address
    /// is fatal.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = std::env::var("TD_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid TD_LISTEN_ADDR")?;
        let cors_allow = std::env::var("TD_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let static_dir = std::env::var("TD_STATIC_DIR").unwrap_or(defaults.static_dir);
        let sms_webhook_url = std::env::var("TD_SMS_WEBHOOK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let log_format = match std::env::var("TD_LOG_FORMAT") {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(env_or("TD_REQUEST_TIMEOUT_MS", 30_000)),
            static_dir,
            live_poll_interval: Duration::from_secs(env_or("TD_LIVE_POLL_SECS", 15).max(1)),
            live_heartbeat: Duration::from_secs(env_or("TD_LIVE_HEARTBEAT_SECS", 20).max(1)),
            search_cache_ttl: Duration::from_secs(env_or("TD_SEARCH_CACHE_SECS", 45)),
            otp_ttl: Duration::from_secs(env_or("TD_OTP_TTL_SECS", 300)),
            otp_max_sends: env_or("TD_OTP_MAX_SENDS", defaults.otp_max_sends),
            otp_window: Duration::from_secs(env_or("TD_OTP_WINDOW_SECS", 600)),
            sms_webhook_url,
            log_format,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("TD_TEST_ENV_OR_GARBAGE", "fifteen");
        assert_eq!(env_or("TD_TEST_ENV_OR_GARBAGE", 15u64), 15);

        std::env::set_var("TD_TEST_ENV_OR_VALID", " 42 ");
        assert_eq!(env_or("TD_TEST_ENV_OR_VALID", 15u64), 42);

        assert_eq!(env_or("TD_TEST_ENV_OR_MISSING", 7usize), 7);
    }
}

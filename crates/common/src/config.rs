use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Telegram Bot API token
    pub telegram_bot_token: String,

    /// Telegram Bot API base URL (override for self-hosted Bot API servers)
    pub telegram_api_url: String,

    /// OpenWeather API key
    pub openweather_api_key: String,

    /// OpenWeather current-weather endpoint
    pub openweather_api_url: String,

    /// Interval between scheduled dispatch cycles in seconds (default: 3600)
    pub dispatch_interval_secs: u64,

    /// Pause between outbound sends within a cycle in milliseconds (default: 1000)
    pub dispatch_send_delay_ms: u64,

    /// Per-request timeout for outbound HTTP calls in seconds (default: 10)
    pub http_timeout_secs: u64,

    /// How long Telegram holds a getUpdates long-poll open in seconds (default: 30)
    pub telegram_poll_timeout_secs: u64,

    /// Bind address for the health/status server
    pub health_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{key} environment variable is required"))
        };
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            lookup(key)
                .unwrap_or_else(|| default.to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{key} must be a valid u64"))
        };

        let config = Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            openweather_api_key: required("OPENWEATHER_API_KEY")?,
            openweather_api_url: lookup("OPENWEATHER_API_URL").unwrap_or_else(|| {
                "https://api.openweathermap.org/data/2.5/weather".to_string()
            }),
            dispatch_interval_secs: number("DISPATCH_INTERVAL_SECS", 3600)?,
            dispatch_send_delay_ms: number("DISPATCH_SEND_DELAY_MS", 1000)?,
            http_timeout_secs: number("HTTP_TIMEOUT_SECS", 10)?,
            telegram_poll_timeout_secs: number("TELEGRAM_POLL_TIMEOUT_SECS", 30)?,
            health_addr: lookup("HEALTH_ADDR")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HEALTH_ADDR must be a socket address"))?,
        };

        if config.dispatch_interval_secs == 0 {
            anyhow::bail!("DISPATCH_INTERVAL_SECS must be greater than zero");
        }
        if config.http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
        }

        Ok(config)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_send_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_poll_timeout_secs)
    }
}

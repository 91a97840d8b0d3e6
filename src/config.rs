//! Runtime configuration read from the environment

use std::env;

use anyhow::{anyhow, Context, Result};

use crate::qr_config::QrConfig;

pub const DEFAULT_PORT: u16 = 8443;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_bot_token: String,
    /// Public URL Telegram should post updates to; polling is used when unset
    pub webhook_url: Option<String>,
    /// Local port the webhook listener binds to
    pub port: u16,
    /// Emit JSON log lines instead of the human readable format
    pub json_logs: bool,
    pub qr: QrConfig,
}

impl BotConfig {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let webhook_url = lookup("WEBHOOK_URL").filter(|url| !url.trim().is_empty());

        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("PORT must be a port number, got {value:?}"))?,
            None => DEFAULT_PORT,
        };

        let json_logs = lookup("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut qr = QrConfig::default();
        if let Some(value) = lookup("QR_MAX_FILE_SIZE") {
            qr.max_file_size = value
                .parse()
                .with_context(|| format!("QR_MAX_FILE_SIZE must be a byte count, got {value:?}"))?;
        }
        if let Some(value) = lookup("QR_DECODE_TIMEOUT_SECS") {
            qr.decode_timeout_secs = value
                .parse()
                .with_context(|| format!("QR_DECODE_TIMEOUT_SECS must be seconds, got {value:?}"))?;
        }
        if let Some(value) = lookup("QR_DOWNLOAD_TIMEOUT_SECS") {
            qr.download_timeout_secs = value
                .parse()
                .with_context(|| format!("QR_DOWNLOAD_TIMEOUT_SECS must be seconds, got {value:?}"))?;
        }

        Ok(Self {
            telegram_bot_token,
            webhook_url,
            port,
            json_logs,
            qr,
        })
    }
}

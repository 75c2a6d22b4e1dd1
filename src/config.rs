//! # Configuration Module
//!
//! Process configuration read from the environment (optionally seeded from a
//! `.env` file by `main`).

use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::ConfigError;

pub const DEFAULT_STORE_PATH: &str = "database.json";

// Default settings block written when the store file does not exist yet
pub const DEFAULT_CHANNEL_ID: &str = "@your_channel";
pub const DEFAULT_CHANNEL_URL: &str = "https://t.me/your_channel";
pub const DEFAULT_WELCOME_TEXT: &str = "👋 <b>Welcome!</b>\n\n🎬 Send me a code and I will find the matching content.";

/// What the subscription gate answers when the membership query fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Treat the user as not subscribed
    #[default]
    Closed,
    /// Let the user through
    Open,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "closed" | "fail-closed" => Ok(FailurePolicy::Closed),
            "open" | "fail-open" => Ok(FailurePolicy::Open),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot credential
    pub bot_token: String,
    /// Path of the JSON document backing the store
    pub store_path: PathBuf,
    /// Administrator ids merged into the store's admin set at start-up
    pub admin_ids: Vec<u64>,
    /// Subscription gate behaviour on oracle failure
    pub failure_policy: FailurePolicy,
    pub log_format: LogFormat,
}

impl BotConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let store_path = lookup("CATALOG_STORE_PATH")
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
            .into();

        let admin_ids = match lookup("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => Vec::new(),
        };

        let failure_policy = match lookup("SUBSCRIPTION_FAILURE_POLICY") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => FailurePolicy::default(),
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bot_token,
            store_path,
            admin_ids,
            failure_policy,
            log_format,
        })
    }
}

/// Parse a comma separated list of Telegram user ids
pub fn parse_admin_ids(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| ConfigError::InvalidAdminId(part.to_string()))
        })
        .collect()
}

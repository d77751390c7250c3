//! Process configuration, read once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const BOT_TOKEN_KEY: &str = "TELEGRAM_BOT_TOKEN";
const CHAT_IDS_KEY: &str = "TELEGRAM_CHAT_IDS";
const CHECK_INTERVAL_KEY: &str = "SCHEDULE_CHECK_INTERVAL";
const DATABASE_KEY: &str = "PROSPERO_DATABASE";
const NOTIFY_DELAY_KEY: &str = "PROSPERO_NOTIFY_DELAY_MS";

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
const DEFAULT_DATABASE: &str = "schedule.db";
const DEFAULT_NOTIFY_DELAY_MS: u64 = 500;

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading configuration.
pub enum ConfigError {
    /// A required key is not set.
    #[error("Missing configuration value {0}")]
    Missing(&'static str),
    /// A key is set but cannot be interpreted.
    #[error("Invalid value {value:?} for {key}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Raw value as found.
        value: String,
    },
    /// The chat id list is empty after trimming.
    #[error("TELEGRAM_CHAT_IDS must contain at least one chat id")]
    NoChatIds,
}

#[derive(Debug, Clone)]
/// Settings shared by the service and the notifier.
pub struct Config {
    /// Telegram bot API token.
    pub telegram_bot_token: String,
    /// Chats every new performance is announced to; never empty.
    pub telegram_chat_ids: Vec<String>,
    /// Pause between poll cycles.
    pub check_interval: Duration,
    /// Location of the SQLite store file.
    pub database_path: PathBuf,
    /// Pause after each notification.
    pub notify_delay: Duration,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required key is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required key is missing or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = lookup(BOT_TOKEN_KEY)
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing(BOT_TOKEN_KEY))?;

        let telegram_chat_ids: Vec<String> = lookup(CHAT_IDS_KEY)
            .ok_or(ConfigError::Missing(CHAT_IDS_KEY))?
            .split(',')
            .map(str::trim)
            .filter(|chat| !chat.is_empty())
            .map(str::to_owned)
            .collect();
        if telegram_chat_ids.is_empty() {
            return Err(ConfigError::NoChatIds);
        }

        let check_interval_secs =
            parse_u64(&lookup, CHECK_INTERVAL_KEY)?.unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);
        if check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: CHECK_INTERVAL_KEY,
                value: check_interval_secs.to_string(),
            });
        }

        let notify_delay_ms =
            parse_u64(&lookup, NOTIFY_DELAY_KEY)?.unwrap_or(DEFAULT_NOTIFY_DELAY_MS);

        let database_path = lookup(DATABASE_KEY)
            .map(|path| path.trim().to_owned())
            .filter(|path| !path.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATABASE), PathBuf::from);

        Ok(Self {
            telegram_bot_token,
            telegram_chat_ids,
            check_interval: Duration::from_secs(check_interval_secs),
            database_path,
            notify_delay: Duration::from_millis(notify_delay_ms),
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_err| ConfigError::Invalid { key, value: raw })
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::connectors::gmail_api::GMAIL_API_BASE;
use crate::db::Database;

pub const DB_PATH_ENV: &str = "MAILSYNC_DB_PATH";
pub const API_BASE_ENV: &str = "MAILSYNC_API_BASE";
pub const HTTP_TIMEOUT_ENV: &str = "MAILSYNC_HTTP_TIMEOUT_SECS";
pub const USER_ENV: &str = "MAILSYNC_USER";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const DEFAULT_BATCH_CAP: usize = 15;

/// Per-sync bounds: how many ids to list and how many of those to detail-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLimits {
    pub list_limit: usize,
    pub batch_cap: usize,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            list_limit: DEFAULT_LIST_LIMIT,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub api_base: String,
    pub http_timeout: Duration,
    pub default_user: Option<String>,
    pub limits: SyncLimits,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let db_path = match env_value(DB_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Database::default_db_path().context("resolve default mailsync database path")?,
        };

        let api_base = env_value(API_BASE_ENV).unwrap_or_else(|| GMAIL_API_BASE.to_string());

        let timeout_secs = env_value(HTTP_TIMEOUT_ENV)
            .map(|raw| parse_timeout_secs(&raw))
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Ok(Self {
            db_path,
            api_base,
            http_timeout: Duration::from_secs(timeout_secs),
            default_user: env_value(USER_ENV),
            limits: SyncLimits::default(),
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_timeout_secs(raw: &str) -> Result<u64> {
    let secs = raw
        .parse::<u64>()
        .with_context(|| format!("{HTTP_TIMEOUT_ENV} must be a whole number of seconds"))?;
    if secs == 0 {
        return Err(anyhow!("{HTTP_TIMEOUT_ENV} must be greater than zero"));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{
        parse_timeout_secs, Settings, SyncLimits, API_BASE_ENV, DB_PATH_ENV, HTTP_TIMEOUT_ENV,
        USER_ENV,
    };

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [DB_PATH_ENV, API_BASE_ENV, HTTP_TIMEOUT_ENV, USER_ENV] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn limits_default_to_twenty_listed_fifteen_fetched() {
        let limits = SyncLimits::default();
        assert_eq!(limits.list_limit, 20);
        assert_eq!(limits.batch_cap, 15);
    }

    #[test]
    fn settings_read_environment_overrides() {
        let _lock = ENV_LOCK.lock().expect("lock env mutation");
        clear_env();
        std::env::set_var(DB_PATH_ENV, "/tmp/mailsync-settings.db");
        std::env::set_var(API_BASE_ENV, "http://127.0.0.1:9999/gmail/v1");
        std::env::set_var(HTTP_TIMEOUT_ENV, "7");
        std::env::set_var(USER_ENV, " user-1 ");

        let settings = Settings::from_env().expect("settings");
        clear_env();

        assert_eq!(
            settings.db_path,
            std::path::PathBuf::from("/tmp/mailsync-settings.db")
        );
        assert_eq!(settings.api_base, "http://127.0.0.1:9999/gmail/v1");
        assert_eq!(settings.http_timeout.as_secs(), 7);
        assert_eq!(settings.default_user.as_deref(), Some("user-1"));
    }

    #[test]
    fn settings_defaults_without_environment() {
        let _lock = ENV_LOCK.lock().expect("lock env mutation");
        clear_env();
        std::env::set_var(DB_PATH_ENV, "/tmp/mailsync-defaults.db");

        let settings = Settings::from_env().expect("settings");
        clear_env();

        assert_eq!(settings.api_base, "https://gmail.googleapis.com/gmail/v1");
        assert_eq!(settings.http_timeout.as_secs(), 20);
        assert!(settings.default_user.is_none());
    }

    #[test]
    fn timeout_must_be_positive_integer() {
        assert_eq!(parse_timeout_secs("30").expect("valid"), 30);
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
    }
}

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level bot configuration, loaded from joinguard.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub telegram: TelegramSection,
    pub database: DatabaseSection,
    pub admin: AdminSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    /// Bot API token from @BotFather. Required.
    pub token: String,
    pub api_url: String,
    /// Long-poll wait passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.telegram.org".into(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:joinguard.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AdminSection {
    /// Telegram user ids allowed to operate the settings menu.
    /// Empty lets anyone who can see the menu use it.
    pub admin_user_ids: Vec<i64>,
}

/// sqlx connection URL for a plain SQLite file path.
pub fn sqlite_url_for_path(path: &str) -> String {
    format!("sqlite:{path}?mode=rwc")
}

impl BotConfig {
    /// Load config from a TOML file, falling back to defaults when it doesn't
    /// exist. Environment variables override file values.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("TELEGRAM_BOT_API_TOKEN") {
            self.telegram.token = v;
        }
        if let Some(v) = lookup("TELEGRAM_API_URL") {
            self.telegram.api_url = v;
        }
        if let Some(v) = lookup("POLL_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.telegram.poll_timeout_secs = secs;
        }
        if let Some(v) = lookup("SQLITE_DATABASE_PATH") {
            self.database.url = sqlite_url_for_path(&v);
        }
        // A full URL wins over a bare path
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("ADMIN_USER_IDS") {
            self.admin.admin_user_ids = v
                .split(',')
                .map(str::trim)
                .filter_map(|s| s.parse().ok())
                .collect();
        }
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!("no bot token configured (set TELEGRAM_BOT_API_TOKEN or telegram.token)");
        }
        if self.database.url.trim().is_empty() {
            bail!("no database configured (set SQLITE_DATABASE_PATH or database.url)");
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.poll_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.database.url, "sqlite:joinguard.db?mode=rwc");
        assert!(config.admin.admin_user_ids.is_empty());
        assert!(config.validate().is_err(), "no token configured");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BotConfig::from_toml(
            r#"
            [telegram]
            token = "123:abc"

            [admin]
            admin_user_ids = [1, 2]
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.admin.admin_user_ids, vec![1, 2]);
        assert_eq!(config.database.url, "sqlite:joinguard.db?mode=rwc");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(BotConfig::from_toml("[telegram\ntoken = 1").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BotConfig::default();
        config.apply_overrides(lookup(&[
            ("TELEGRAM_BOT_API_TOKEN", "999:xyz"),
            ("SQLITE_DATABASE_PATH", "/var/lib/joinguard/settings.db"),
            ("POLL_TIMEOUT_SECS", "50"),
            ("ADMIN_USER_IDS", "10, 20,not-a-number,,30"),
        ]));
        assert_eq!(config.telegram.token, "999:xyz");
        assert_eq!(
            config.database.url,
            "sqlite:/var/lib/joinguard/settings.db?mode=rwc"
        );
        assert_eq!(config.poll_timeout(), Duration::from_secs(50));
        assert_eq!(config.admin.admin_user_ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_database_url_beats_path() {
        let mut config = BotConfig::default();
        config.apply_overrides(lookup(&[
            ("SQLITE_DATABASE_PATH", "a.db"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]));
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn test_unparseable_timeout_is_ignored() {
        let mut config = BotConfig::default();
        config.apply_overrides(lookup(&[("POLL_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_blank_token_rejected() {
        let mut config = BotConfig::default();
        config.telegram.token = "   ".into();
        assert!(config.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::models::SettingsRow;
use crate::db::queries::settings as queries;
use crate::error::BotError;

/// Mute duration used until an administrator picks another one.
pub const DEFAULT_MUTE_DURATION_SECS: i64 = 300;

/// Longest mute duration the store accepts: 100 years. Every expiry computed
/// from a stored duration stays representable.
pub const MAX_MUTE_DURATION_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// The global bot configuration. There is exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether new members get muted at all.
    pub enabled: bool,
    pub mute_duration_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            mute_duration_seconds: DEFAULT_MUTE_DURATION_SECS,
        }
    }
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        Self {
            enabled: row.enabled != 0,
            mute_duration_seconds: row.mute_duration_seconds,
        }
    }
}

/// Sole owner of the persisted [`Settings`] record.
///
/// Every read-modify-write runs while holding `cache`, so two handlers can
/// never interleave their updates. The cached copy is replaced only after the
/// database write has committed.
pub struct SettingsStore {
    pool: SqlitePool,
    cache: Mutex<Option<Settings>>,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Mutex::new(None),
        }
    }

    /// Create the record with defaults on first run, otherwise load it.
    /// Safe to call repeatedly; an existing record is never reset.
    pub async fn initialize(&self) -> Result<Settings, BotError> {
        let mut cache = self.cache.lock().await;
        let defaults = Settings::default();
        let created = queries::insert_settings_if_absent(
            &self.pool,
            defaults.enabled,
            defaults.mute_duration_seconds,
        )
        .await?;

        let settings = self.load().await?;
        if created {
            info!(?settings, "created default bot settings");
        } else {
            info!(?settings, "loaded bot settings");
        }
        *cache = Some(settings);
        Ok(settings)
    }

    /// The current settings, from the cache when warm.
    pub async fn current(&self) -> Result<Settings, BotError> {
        let mut cache = self.cache.lock().await;
        if let Some(settings) = *cache {
            return Ok(settings);
        }
        let settings = self.load().await?;
        *cache = Some(settings);
        Ok(settings)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<Settings, BotError> {
        let mut cache = self.cache.lock().await;
        self.write_enabled(&mut cache, enabled).await
    }

    /// Flip the enabled flag. The read and the write happen under one lock.
    pub async fn toggle_enabled(&self) -> Result<Settings, BotError> {
        let mut cache = self.cache.lock().await;
        let current = match *cache {
            Some(settings) => settings,
            None => self.load().await?,
        };
        self.write_enabled(&mut cache, !current.enabled).await
    }

    /// Change the mute duration. Picking the value already stored is a no-op
    /// that still returns the current record.
    pub async fn set_mute_duration(&self, seconds: i64) -> Result<Settings, BotError> {
        let (settings, _) = self.change_mute_duration(seconds).await?;
        Ok(settings)
    }

    /// Like [`set_mute_duration`](Self::set_mute_duration), also reporting
    /// whether the record was written.
    pub async fn change_mute_duration(&self, seconds: i64) -> Result<(Settings, bool), BotError> {
        if !(1..=MAX_MUTE_DURATION_SECS).contains(&seconds) {
            return Err(BotError::InvalidDuration(seconds));
        }

        let mut cache = self.cache.lock().await;
        let current = match *cache {
            Some(settings) => settings,
            None => self.load().await?,
        };
        if current.mute_duration_seconds == seconds {
            debug!(seconds, "mute duration unchanged, skipping write");
            *cache = Some(current);
            return Ok((current, false));
        }

        if !queries::set_mute_duration(&self.pool, seconds).await? {
            return Err(sqlx::Error::RowNotFound.into());
        }
        let updated = Settings {
            mute_duration_seconds: seconds,
            ..current
        };
        *cache = Some(updated);
        info!(seconds, "mute duration updated");
        Ok((updated, true))
    }

    async fn write_enabled(
        &self,
        cache: &mut Option<Settings>,
        enabled: bool,
    ) -> Result<Settings, BotError> {
        let current = match *cache {
            Some(settings) => settings,
            None => self.load().await?,
        };
        if !queries::set_enabled(&self.pool, enabled).await? {
            return Err(sqlx::Error::RowNotFound.into());
        }
        let updated = Settings { enabled, ..current };
        *cache = Some(updated);
        info!(enabled, "bot enabled flag updated");
        Ok(updated)
    }

    async fn load(&self) -> Result<Settings, BotError> {
        let row = queries::get_settings(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(row.into())
    }
}

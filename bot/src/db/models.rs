use serde::{Deserialize, Serialize};

/// The stored settings row. SQLite has no boolean column type, so `enabled`
/// comes back as an integer and is converted by the settings store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettingsRow {
    pub id: i64,
    pub enabled: i32,
    pub mute_duration_seconds: i64,
    pub created_at: String,
    pub updated_at: String,
}

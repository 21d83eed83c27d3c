use sqlx::SqlitePool;

use crate::db::models::SettingsRow;

/// Fetch the settings row, if it has been created.
pub async fn get_settings(pool: &SqlitePool) -> Result<Option<SettingsRow>, sqlx::Error> {
    sqlx::query_as::<_, SettingsRow>("SELECT * FROM bot_settings WHERE id = 1")
        .fetch_optional(pool)
        .await
}

/// Create the settings row unless it already exists. Returns true if a row was inserted.
pub async fn insert_settings_if_absent(
    pool: &SqlitePool,
    enabled: bool,
    mute_duration_seconds: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO bot_settings (id, enabled, mute_duration_seconds) VALUES (1, ?, ?)",
    )
    .bind(enabled as i32)
    .bind(mute_duration_seconds)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_enabled(pool: &SqlitePool, enabled: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE bot_settings SET enabled = ?, updated_at = datetime('now') WHERE id = 1",
    )
    .bind(enabled as i32)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_mute_duration(pool: &SqlitePool, seconds: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE bot_settings SET mute_duration_seconds = ?, updated_at = datetime('now') WHERE id = 1",
    )
    .bind(seconds)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::{create_pool, run_migrations};

    async fn setup_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_before_insert_is_none() {
        let pool = setup_db().await;
        assert!(get_settings(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_if_absent_only_once() {
        let pool = setup_db().await;

        assert!(insert_settings_if_absent(&pool, false, 300).await.unwrap());
        // Second insert must not overwrite the first
        assert!(!insert_settings_if_absent(&pool, true, 30).await.unwrap());

        let row = get_settings(&pool).await.unwrap().unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.enabled, 0);
        assert_eq!(row.mute_duration_seconds, 300);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bot_settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_set_enabled() {
        let pool = setup_db().await;
        insert_settings_if_absent(&pool, false, 300).await.unwrap();

        assert!(set_enabled(&pool, true).await.unwrap());
        assert_eq!(get_settings(&pool).await.unwrap().unwrap().enabled, 1);

        set_enabled(&pool, false).await.unwrap();
        assert_eq!(get_settings(&pool).await.unwrap().unwrap().enabled, 0);
    }

    #[tokio::test]
    async fn test_set_mute_duration() {
        let pool = setup_db().await;
        insert_settings_if_absent(&pool, false, 300).await.unwrap();

        assert!(set_mute_duration(&pool, 60).await.unwrap());
        let row = get_settings(&pool).await.unwrap().unwrap();
        assert_eq!(row.mute_duration_seconds, 60);
        assert_eq!(row.enabled, 0);
    }

    #[tokio::test]
    async fn test_updates_without_row_touch_nothing() {
        let pool = setup_db().await;
        assert!(!set_enabled(&pool, true).await.unwrap());
        assert!(!set_mute_duration(&pool, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_positive_duration_rejected_by_schema() {
        let pool = setup_db().await;
        insert_settings_if_absent(&pool, false, 300).await.unwrap();

        assert!(set_mute_duration(&pool, 0).await.is_err());
        let row = get_settings(&pool).await.unwrap().unwrap();
        assert_eq!(row.mute_duration_seconds, 300);
    }
}

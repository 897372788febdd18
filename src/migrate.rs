use sqlx::SqlitePool;
use tracing::info;

static MIGRATIONS: &[(&str, &str)] = &[
    (
        "202601121000_initial.sql",
        include_str!("../migrations/202601121000_initial.sql"),
    ),
    (
        "202601121010_documents.sql",
        include_str!("../migrations/202601121010_documents.sql"),
    ),
    (
        "202601121020_company_settings.sql",
        include_str!("../migrations/202601121020_company_settings.sql"),
    ),
];

/// Apply any pending migrations. Each file runs in its own transaction and is
/// recorded in `schema_migrations` so reruns are no-ops.
pub async fn apply_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\n            version TEXT PRIMARY KEY,\n            applied_at TEXT NOT NULL\n        )",
    )
    .execute(pool)
    .await?;

    for (version, sql) in MIGRATIONS {
        let applied: Option<String> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?1")
                .bind(version)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(version)
            .bind(crate::time::now_iso())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(target: "shoplite", event = "migration_applied", version = %version);
    }

    Ok(())
}

/// Latest applied migration version, if any.
pub async fn schema_version(pool: &SqlitePool) -> anyhow::Result<Option<String>> {
    let version: Option<String> =
        sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_pool;

    #[tokio::test]
    async fn migrations_apply_and_rerun_cleanly() {
        let pool = open_memory_pool().await.unwrap();
        apply_migrations(&pool).await.unwrap();
        apply_migrations(&pool).await.unwrap();

        let version = schema_version(&pool).await.unwrap();
        assert_eq!(
            version.as_deref(),
            Some("202601121020_company_settings.sql")
        );

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Seed row from the settings migration.
        let settings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM company_settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(settings, 1);
    }
}

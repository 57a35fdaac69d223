//! Schema migrations for the SQLite mirror.
//!
//! Migration files live next to this module:
//! - `migration_NN_up.sql` moves the schema from version `NN-1` to version `NN`
//! - `migration_NN_down.sql` moves the schema from version `NN` back to version `NN-1`

use crate::error::Res;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

struct Migration {
    /// The version this migration brings the database to when going up.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        up_sql: include_str!("migration_01_up.sql"),
        down_sql: include_str!("migration_01_down.sql"),
    },
    Migration {
        version: 2,
        up_sql: include_str!("migration_02_up.sql"),
        down_sql: include_str!("migration_02_down.sql"),
    },
];

/// The schema version this build expects.
pub(crate) const CURRENT_VERSION: i32 = 2;

/// Creates the `schema_version` table at version 0 if it does not exist yet.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin bootstrap transaction")?;
    tx.execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .await
        .context("Failed to create schema_version table")?;
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count schema_version rows")?;
    if rows == 0 {
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&mut *tx)
            .await
            .context("Failed to insert initial schema version")?;
    }
    tx.commit()
        .await
        .context("Failed to commit bootstrap transaction")
}

pub(crate) async fn version(pool: &SqlitePool) -> Res<i32> {
    let (version,): (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    Ok(version)
}

/// Moves the schema from `current_ver` to `target_ver`, up or down.
///
/// Every step runs in its own transaction together with the `schema_version` update. All steps
/// are checked to exist before any of them runs.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Res<()> {
    if current_ver == target_ver {
        debug!("Database already at version {target_ver}");
        return Ok(());
    }

    validate_migrations(current_ver, target_ver)?;

    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            let migration = find(version)?;
            debug!("Running migration {version:02} (up)");
            run_single_migration(pool, migration.up_sql, version).await?;
        }
    } else {
        for version in (target_ver + 1..=current_ver).rev() {
            let migration = find(version)?;
            debug!("Running migration {version:02} (down)");
            run_single_migration(pool, migration.down_sql, version - 1).await?;
        }
    }

    debug!("Schema now at version {target_ver}");
    Ok(())
}

fn find(version: i32) -> Res<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

fn validate_migrations(current_version: i32, target_version: i32) -> Res<()> {
    let (start, end) = if current_version < target_version {
        (current_version + 1, target_version)
    } else {
        (target_version + 1, current_version)
    };

    for version in start..=end {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!(
                "Migration {version} is missing but required to migrate from version \
                {current_version} to {target_version}"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_db() -> (TempDir, SqlitePool) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        (temp_dir, pool)
    }

    async fn object_exists(pool: &SqlitePool, kind: &str, name: &str) -> bool {
        let (count,): (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type=? AND name=?")
                .bind(kind)
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        count > 0
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let (_dir, pool) = create_test_db().await;
        bootstrap(&pool).await.unwrap();
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migration_up_creates_tables() {
        let (_dir, pool) = create_test_db().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        assert_eq!(version(&pool).await.unwrap(), CURRENT_VERSION);
        assert!(object_exists(&pool, "table", "transactions").await);
        assert!(object_exists(&pool, "table", "outbox").await);
        assert!(object_exists(&pool, "index", "idx_transactions_account_date").await);
    }

    #[tokio::test]
    async fn test_migration_down_drops_tables() {
        let (_dir, pool) = create_test_db().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();

        run(&pool, CURRENT_VERSION, 1).await.unwrap();
        assert_eq!(version(&pool).await.unwrap(), 1);
        assert!(!object_exists(&pool, "index", "idx_transactions_account_date").await);
        assert!(object_exists(&pool, "table", "transactions").await);

        run(&pool, 1, 0).await.unwrap();
        assert_eq!(version(&pool).await.unwrap(), 0);
        assert!(!object_exists(&pool, "table", "transactions").await);
        assert!(!object_exists(&pool, "table", "outbox").await);
    }

    #[tokio::test]
    async fn test_migration_no_op_when_already_at_target() {
        let (_dir, pool) = create_test_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_validate_migrations() {
        assert!(validate_migrations(0, CURRENT_VERSION).is_ok());
        assert!(validate_migrations(CURRENT_VERSION, 0).is_ok());
        assert!(validate_migrations(0, CURRENT_VERSION + 1).is_err());
        assert!(validate_migrations(CURRENT_VERSION + 2, 1).is_err());
    }
}

use billing_core::MonthlyAggregate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub type DbPool = Pool<Sqlite>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Opens (creating if needed) the summary database for the loader.
pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS monthly_summary (
            month TEXT NOT NULL,
            creditor TEXT NOT NULL,
            status TEXT NOT NULL,
            creditor_key TEXT NOT NULL,
            status_key TEXT NOT NULL,
            record_count INTEGER NOT NULL,
            total_amount REAL NOT NULL,
            average_amount REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Replaces the whole summary table with `rows`.
///
/// `creditor_key` and `status_key` hold the Unicode lower-case forms used by
/// the query filters; SQLite's `LOWER` only folds ASCII.
///
/// Rows go into a staging table which is renamed over the live one in the
/// same transaction: readers see either the previous summary or the new
/// one, and a failed load leaves the previous summary in place. Concurrent
/// loads are not coordinated here; callers run one pipeline at a time.
pub async fn replace_monthly_summary(
    pool: &DbPool,
    rows: &[MonthlyAggregate],
) -> Result<u64, StorageError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DROP TABLE IF EXISTS monthly_summary_staging")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        CREATE TABLE monthly_summary_staging (
            month TEXT NOT NULL,
            creditor TEXT NOT NULL,
            status TEXT NOT NULL,
            creditor_key TEXT NOT NULL,
            status_key TEXT NOT NULL,
            record_count INTEGER NOT NULL,
            total_amount REAL NOT NULL,
            average_amount REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    let mut inserted = 0u64;
    for row in rows {
        inserted += sqlx::query(
            "INSERT INTO monthly_summary_staging (month, creditor, status, creditor_key, status_key, record_count, total_amount, average_amount) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(row.month.to_string())
        .bind(&row.creditor)
        .bind(row.status.label())
        .bind(row.creditor.to_lowercase())
        .bind(row.status.label().to_lowercase())
        .bind(row.record_count)
        .bind(row.total_amount.to_f64())
        .bind(row.average_amount.to_f64())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    sqlx::query("DROP TABLE IF EXISTS monthly_summary")
        .execute(&mut *tx)
        .await?;
    sqlx::query("ALTER TABLE monthly_summary_staging RENAME TO monthly_summary")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(rows = inserted, "replaced monthly summary table");
    Ok(inserted)
}

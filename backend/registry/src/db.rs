//! Database layer: migrations and raw document reads/writes.
//!
//! Bodies are stored as JSON text. The `status` column mirrors the body's
//! `status` field so that status filters run in SQL, and `version` is bumped
//! on every write so callers can make conditional (compare-and-swap) updates.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::path::{Collection, DocPath};

/// One row of the `documents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub owner_key: String,
    pub record_id: String,
    pub body: String,
    pub status: Option<String>,
    pub version: i64,
    pub updated_at: i64,
}

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn fetch_document(pool: &SqlitePool, path: &DocPath) -> Result<Option<DocumentRow>> {
    let row = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT owner_key, record_id, body, status, version, updated_at
        FROM   documents
        WHERE  collection = ?1 AND owner_key = ?2 AND record_id = ?3
        "#,
    )
    .bind(path.collection.as_str())
    .bind(&path.owner)
    .bind(&path.id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All records under one owner key, in key (creation) order.
pub async fn fetch_children(
    pool: &SqlitePool,
    collection: Collection,
    owner: &str,
) -> Result<Vec<DocumentRow>> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT owner_key, record_id, body, status, version, updated_at
        FROM   documents
        WHERE  collection = ?1 AND owner_key = ?2
        ORDER  BY record_id ASC
        "#,
    )
    .bind(collection.as_str())
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every record in a collection, across all owners.
pub async fn fetch_collection(
    pool: &SqlitePool,
    collection: Collection,
) -> Result<Vec<DocumentRow>> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT owner_key, record_id, body, status, version, updated_at
        FROM   documents
        WHERE  collection = ?1
        ORDER  BY owner_key ASC, record_id ASC
        "#,
    )
    .bind(collection.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn fetch_by_status(
    pool: &SqlitePool,
    collection: Collection,
    status: &str,
) -> Result<Vec<DocumentRow>> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT owner_key, record_id, body, status, version, updated_at
        FROM   documents
        WHERE  collection = ?1 AND status = ?2
        ORDER  BY owner_key ASC, record_id ASC
        "#,
    )
    .bind(collection.as_str())
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Unconditional full-record set. Returns the new version.
pub async fn upsert_document(
    pool: &SqlitePool,
    path: &DocPath,
    body: &str,
    status: Option<&str>,
    now: i64,
) -> Result<i64> {
    let version: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO documents
            (collection, owner_key, record_id, body, status, version, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
        ON CONFLICT (collection, owner_key, record_id) DO UPDATE SET
            body       = excluded.body,
            status     = excluded.status,
            version    = documents.version + 1,
            updated_at = excluded.updated_at
        RETURNING version
        "#,
    )
    .bind(path.collection.as_str())
    .bind(&path.owner)
    .bind(&path.id)
    .bind(body)
    .bind(status)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(version)
}

/// Create a document. Returns `false` (and writes nothing) if the key is taken.
pub async fn insert_document<'e>(
    executor: impl SqliteExecutor<'e>,
    path: &DocPath,
    body: &str,
    status: Option<&str>,
    now: i64,
) -> Result<bool> {
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO documents
            (collection, owner_key, record_id, body, status, version, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
        "#,
    )
    .bind(path.collection.as_str())
    .bind(&path.owner)
    .bind(&path.id)
    .bind(body)
    .bind(status)
    .bind(now)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(rows_affected == 1)
}

/// Replace a document only if it is still at `expected_version`.
///
/// Returns `false` when another writer got there first (or the document is
/// gone); nothing is written in that case.
pub async fn compare_and_swap<'e>(
    executor: impl SqliteExecutor<'e>,
    path: &DocPath,
    expected_version: i64,
    body: &str,
    status: Option<&str>,
    now: i64,
) -> Result<bool> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE documents
        SET    body = ?5, status = ?6, version = version + 1, updated_at = ?7
        WHERE  collection = ?1 AND owner_key = ?2 AND record_id = ?3 AND version = ?4
        "#,
    )
    .bind(path.collection.as_str())
    .bind(&path.owner)
    .bind(&path.id)
    .bind(expected_version)
    .bind(body)
    .bind(status)
    .bind(now)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(rows_affected == 1)
}

//! Typed document store over the `documents` table.
//!
//! Supports the five operations every portal relied on: get-all-children as a
//! snapshot, subscribe to live updates, partial field update, full record set
//! and append-with-generated-key. On top of those, [`Store::replace`] is the
//! conditional write every status transition goes through.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::db::{self, DocumentRow};
use crate::errors::{RegistryError, Result};
use crate::keys::PushIdGenerator;
use crate::path::{Collection, DocPath};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A decoded document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub path: DocPath,
    pub version: i64,
    pub value: T,
}

/// Notification emitted after every successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: DocPath,
    pub status: Option<String>,
    pub version: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: broadcast::Sender<Change>,
    ids: Arc<PushIdGenerator>,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            pool,
            changes,
            ids: Arc::new(PushIdGenerator::new()),
        }
    }

    /// Subscribe to live updates. Lagging receivers skip missed changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    /// Reserve a generated key without writing anything.
    pub fn new_key(&self) -> String {
        self.ids.next()
    }

    // ─────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Option<Versioned<T>>> {
        db::fetch_document(&self.pool, path)
            .await?
            .map(|row| decode(path.collection, row))
            .transpose()
    }

    /// Like [`Store::get`], but a missing document is an error.
    pub async fn require<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Versioned<T>> {
        self.get(path)
            .await?
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))
    }

    /// Snapshot of every record under `Collection/{owner}`.
    pub async fn children<T: DeserializeOwned>(
        &self,
        collection: Collection,
        owner: &str,
    ) -> Result<Vec<Versioned<T>>> {
        db::fetch_children(&self.pool, collection, owner)
            .await?
            .into_iter()
            .map(|row| decode(collection, row))
            .collect()
    }

    /// Snapshot of an entire collection, flattened across owners.
    pub async fn collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<Versioned<T>>> {
        db::fetch_collection(&self.pool, collection)
            .await?
            .into_iter()
            .map(|row| decode(collection, row))
            .collect()
    }

    pub async fn with_status<T: DeserializeOwned>(
        &self,
        collection: Collection,
        status: &str,
    ) -> Result<Vec<Versioned<T>>> {
        db::fetch_by_status(&self.pool, collection, status)
            .await?
            .into_iter()
            .map(|row| decode(collection, row))
            .collect()
    }

    // ─────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────

    /// Full-record set; creates or overwrites.
    pub async fn set<T: Serialize>(&self, path: &DocPath, value: &T) -> Result<i64> {
        let (body, status) = encode(value)?;
        let version =
            db::upsert_document(&self.pool, path, &body, status.as_deref(), now_millis()).await?;
        self.notify(path, status, version);
        Ok(version)
    }

    /// Create a document at `path`; an existing document is never overwritten.
    pub async fn create<T: Serialize>(&self, path: &DocPath, value: &T) -> Result<()> {
        let (body, status) = encode(value)?;
        if !db::insert_document(&self.pool, path, &body, status.as_deref(), now_millis()).await? {
            return Err(RegistryError::Conflict(path.to_string()));
        }
        self.notify(path, status, 1);
        Ok(())
    }

    /// Append under a freshly generated key and return its path.
    pub async fn push<T: Serialize>(
        &self,
        collection: Collection,
        owner: &str,
        value: &T,
    ) -> Result<DocPath> {
        let path = DocPath::nested(collection, owner, self.new_key());
        self.create(&path, value).await?;
        Ok(path)
    }

    /// Merge top-level `fields` into an existing document; `null` removes a field.
    pub async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<i64> {
        let row = db::fetch_document(&self.pool, path)
            .await?
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;

        let mut body: Value = serde_json::from_str(&row.body)?;
        let object = body.as_object_mut().ok_or_else(|| {
            RegistryError::Validation(format!("{path} does not hold an object"))
        })?;
        for (key, value) in fields {
            if value.is_null() {
                object.remove(&key);
            } else {
                object.insert(key, value);
            }
        }

        self.replace(path, row.version, &body).await
    }

    /// Compare-and-swap: write `value` only if the document is still at
    /// `expected_version`. Returns the new version.
    pub async fn replace<T: Serialize>(
        &self,
        path: &DocPath,
        expected_version: i64,
        value: &T,
    ) -> Result<i64> {
        let (body, status) = encode(value)?;
        let swapped = db::compare_and_swap(
            &self.pool,
            path,
            expected_version,
            &body,
            status.as_deref(),
            now_millis(),
        )
        .await?;

        if !swapped {
            warn!("Lost concurrent update on {path} (expected version {expected_version})");
            return Err(RegistryError::Conflict(path.to_string()));
        }

        let version = expected_version + 1;
        self.notify(path, status, version);
        Ok(version)
    }

    /// [`Store::replace`] plus a [`Store::create`] in one transaction; either
    /// both documents are written or neither is.
    pub async fn replace_and_create<T: Serialize, U: Serialize>(
        &self,
        path: &DocPath,
        expected_version: i64,
        value: &T,
        new_path: &DocPath,
        new_value: &U,
    ) -> Result<i64> {
        let (body, status) = encode(value)?;
        let (new_body, new_status) = encode(new_value)?;
        let now = now_millis();

        // Dropping `tx` without commit rolls back.
        let mut tx = self.pool.begin().await?;
        if !db::compare_and_swap(&mut *tx, path, expected_version, &body, status.as_deref(), now)
            .await?
        {
            warn!("Lost concurrent update on {path} (expected version {expected_version})");
            return Err(RegistryError::Conflict(path.to_string()));
        }
        if !db::insert_document(&mut *tx, new_path, &new_body, new_status.as_deref(), now).await? {
            warn!("{new_path} already exists; {path} left at version {expected_version}");
            return Err(RegistryError::Conflict(new_path.to_string()));
        }
        tx.commit().await?;

        let version = expected_version + 1;
        self.notify(path, status, version);
        self.notify(new_path, new_status, 1);
        Ok(version)
    }

    fn notify(&self, path: &DocPath, status: Option<String>, version: i64) {
        debug!("{path} -> v{version} ({status:?})");
        // No receivers is fine; nobody is listening yet.
        let _ = self.changes.send(Change {
            path: path.clone(),
            status,
            version,
        });
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn encode<T: Serialize>(value: &T) -> Result<(String, Option<String>)> {
    let value = serde_json::to_value(value)?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok((serde_json::to_string(&value)?, status))
}

fn decode<T: DeserializeOwned>(collection: Collection, row: DocumentRow) -> Result<Versioned<T>> {
    let path = if collection.is_nested() {
        DocPath::nested(collection, row.owner_key, row.record_id)
    } else {
        DocPath::flat(collection, row.record_id)
    };
    Ok(Versioned {
        path,
        version: row.version,
        value: serde_json::from_str(&row.body)?,
    })
}

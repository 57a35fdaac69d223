//! Local persistence contracts and their implementations.
//!
//! - `LocalStore` is the mirror of the transaction set that offline reads are served from.
//! - `OutboxStore` is the durable queue of writes waiting to be replayed against the remote.
//! - `FileCache` is the JSON snapshot of the last known-good list.
//!
//! Two interchangeable backends implement both store traits: SQLite (`crate::db::Db`) and plain
//! JSON files (`JsonStore`). Which one is used is decided once, at startup, by configuration.

mod cache;
mod ids;
mod json;
mod migrate;

pub use cache::FileCache;
pub(crate) use ids::PlaceholderIds;
pub use json::JsonStore;
pub use migrate::{migrate, MigrationReport};

use crate::db::Db;
use crate::error::Res;
use crate::model::{OutboxEntry, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// The mirror of the transaction set.
#[async_trait::async_trait]
pub trait LocalStore: Send + Sync {
    async fn get_all(&self) -> Res<Vec<Transaction>>;

    async fn get(&self, id: i64) -> Res<Option<Transaction>>;

    /// Inserts `transaction`, replacing any record with the same id.
    async fn create(&self, transaction: &Transaction) -> Res<()>;

    /// Replaces the record with the same id. It is an error if no such record exists.
    async fn update(&self, transaction: &Transaction) -> Res<()>;

    /// Deletes the record with `id`. Deleting a missing record is not an error.
    async fn delete(&self, id: i64) -> Res<()>;

    async fn replace_all(&self, transactions: &[Transaction]) -> Res<()>;
}

/// The durable queue of pending writes.
#[async_trait::async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns all entries in the order they were first queued.
    async fn get_all(&self) -> Res<Vec<OutboxEntry>>;

    /// Inserts `entry` or replaces the entry with the same id. A replaced entry keeps its queue
    /// position.
    async fn save(&self, entry: &OutboxEntry) -> Res<()>;

    async fn delete(&self, id: i64) -> Res<()>;
}

/// Selects the storage backend for the mirror and the outbox.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Sqlite,
    Json,
}

serde_plain::derive_display_from_serialize!(StorageMode);
serde_plain::derive_fromstr_from_deserialize!(StorageMode);

/// An opened storage backend. Both handles share the same underlying connection or files.
#[derive(Clone)]
pub struct Storage {
    mode: StorageMode,
    local: Arc<dyn LocalStore>,
    outbox: Arc<dyn OutboxStore>,
}

impl Storage {
    /// Opens (creating it if needed) the backend selected by `mode` inside the `root` directory.
    pub(crate) async fn open(root: &Path, mode: StorageMode) -> Res<Self> {
        match mode {
            StorageMode::Sqlite => {
                let db = Db::open(root.join(crate::db::SQLITE_FILE)).await?;
                Ok(Self::from_parts(
                    mode,
                    Arc::new(db.clone()),
                    Arc::new(db),
                ))
            }
            StorageMode::Json => {
                let store = JsonStore::new(root);
                Ok(Self::from_parts(
                    mode,
                    Arc::new(store.clone()),
                    Arc::new(store),
                ))
            }
        }
    }

    pub fn from_parts(
        mode: StorageMode,
        local: Arc<dyn LocalStore>,
        outbox: Arc<dyn OutboxStore>,
    ) -> Self {
        Self {
            mode,
            local,
            outbox,
        }
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn local(&self) -> Arc<dyn LocalStore> {
        self.local.clone()
    }

    pub fn outbox(&self) -> Arc<dyn OutboxStore> {
        self.outbox.clone()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("mode", &self.mode).finish()
    }
}

/// Contract tests that every backend must pass.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::model::OutboxAction;
    use crate::test::sample_transaction;

    pub(crate) async fn local_store_contract(store: &dyn LocalStore) {
        assert!(store.get_all().await.unwrap().is_empty());

        let a = sample_transaction(1, "500");
        let b = sample_transaction(2, "200");
        store.create(&a).await.unwrap();
        store.create(&b).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(a.clone()));
        assert_eq!(store.get_all().await.unwrap().len(), 2);

        let mut updated = a.clone();
        updated.comment = Some("changed".to_string());
        store.update(&updated).await.unwrap();
        assert_eq!(
            store.get(1).await.unwrap().unwrap().comment.as_deref(),
            Some("changed")
        );
        assert!(store.update(&sample_transaction(99, "1")).await.is_err());

        store.delete(2).await.unwrap();
        store.delete(2).await.unwrap();
        assert!(store.get(2).await.unwrap().is_none());

        let c = sample_transaction(3, "3");
        store.replace_all(&[c.clone()]).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), vec![c]);
    }

    pub(crate) async fn outbox_store_contract(store: &dyn OutboxStore) {
        assert!(store.get_all().await.unwrap().is_empty());

        let first = OutboxEntry::new(OutboxAction::Create, sample_transaction(-1, "10"));
        let second = OutboxEntry::new(OutboxAction::Update, sample_transaction(5, "20"));
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        // Upsert keeps the queue position of the original entry.
        let replaced = OutboxEntry::new(OutboxAction::Update, sample_transaction(-1, "11"));
        store.save(&replaced).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![replaced, second.clone()]);

        store.delete(-1).await.unwrap();
        store.delete(-1).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), vec![second]);
    }
}

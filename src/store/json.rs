use crate::error::Res;
use crate::model::{dedup_by_id, OutboxEntry, Transaction};
use crate::store::{LocalStore, OutboxStore};
use crate::utils;
use anyhow::bail;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) const MIRROR_FILE: &str = "mirror.json";
pub(crate) const OUTBOX_FILE: &str = "outbox.json";

/// Stores the mirror and the outbox as two JSON arrays. Every mutation rewrites the whole file
/// atomically.
#[derive(Debug, Clone)]
pub struct JsonStore {
    mirror_path: PathBuf,
    outbox_path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            mirror_path: root.join(MIRROR_FILE),
            outbox_path: root.join(OUTBOX_FILE),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_mirror(&self) -> Res<Vec<Transaction>> {
        utils::deserialize_or_default(&self.mirror_path).await
    }

    async fn write_mirror(&self, transactions: &[Transaction]) -> Res<()> {
        utils::serialize(&self.mirror_path, transactions).await
    }

    async fn read_outbox(&self) -> Res<Vec<OutboxEntry>> {
        utils::deserialize_or_default(&self.outbox_path).await
    }

    async fn write_outbox(&self, entries: &[OutboxEntry]) -> Res<()> {
        utils::serialize(&self.outbox_path, entries).await
    }
}

#[async_trait::async_trait]
impl LocalStore for JsonStore {
    async fn get_all(&self) -> Res<Vec<Transaction>> {
        let _guard = self.lock.lock().await;
        self.read_mirror().await
    }

    async fn get(&self, id: i64) -> Res<Option<Transaction>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_mirror().await?.into_iter().find(|t| t.id == id))
    }

    async fn create(&self, transaction: &Transaction) -> Res<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_mirror().await?;
        match all.iter_mut().find(|t| t.id == transaction.id) {
            Some(existing) => *existing = transaction.clone(),
            None => all.push(transaction.clone()),
        }
        self.write_mirror(&all).await
    }

    async fn update(&self, transaction: &Transaction) -> Res<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_mirror().await?;
        let Some(existing) = all.iter_mut().find(|t| t.id == transaction.id) else {
            bail!("Transaction {} is not in the local store", transaction.id);
        };
        *existing = transaction.clone();
        self.write_mirror(&all).await
    }

    async fn delete(&self, id: i64) -> Res<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_mirror().await?;
        let before = all.len();
        all.retain(|t| t.id != id);
        if all.len() == before {
            return Ok(());
        }
        self.write_mirror(&all).await
    }

    async fn replace_all(&self, transactions: &[Transaction]) -> Res<()> {
        let _guard = self.lock.lock().await;
        self.write_mirror(&dedup_by_id(transactions.iter().cloned()))
            .await
    }
}

#[async_trait::async_trait]
impl OutboxStore for JsonStore {
    async fn get_all(&self) -> Res<Vec<OutboxEntry>> {
        let _guard = self.lock.lock().await;
        self.read_outbox().await
    }

    async fn save(&self, entry: &OutboxEntry) -> Res<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_outbox().await?;
        match all.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => all.push(entry.clone()),
        }
        self.write_outbox(&all).await
    }

    async fn delete(&self, id: i64) -> Res<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_outbox().await?;
        let before = all.len();
        all.retain(|e| e.id != id);
        if all.len() == before {
            return Ok(());
        }
        self.write_outbox(&all).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use crate::test::sample_transaction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_store_contract() {
        let dir = TempDir::new().unwrap();
        contract::local_store_contract(&JsonStore::new(dir.path())).await;
    }

    #[tokio::test]
    async fn test_outbox_store_contract() {
        let dir = TempDir::new().unwrap();
        contract::outbox_store_contract(&JsonStore::new(dir.path())).await;
    }

    #[tokio::test]
    async fn test_files_are_shared_between_handles() {
        let dir = TempDir::new().unwrap();
        let a = JsonStore::new(dir.path());
        LocalStore::create(&a, &sample_transaction(1, "1")).await.unwrap();
        let b = JsonStore::new(dir.path());
        assert_eq!(LocalStore::get_all(&b).await.unwrap().len(), 1);
        assert!(OutboxStore::get_all(&b).await.unwrap().is_empty());
        assert!(utils::exists(&dir.path().join(MIRROR_FILE)).await.unwrap());
    }
}

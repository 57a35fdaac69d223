use crate::error::Res;
use crate::model::{dedup_by_id, Transaction};
use crate::utils;
use anyhow::{bail, Context};
use std::path::Path;
use tracing::{debug, warn};

/// The in-memory list of last known-good transactions, persisted as a JSON array.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FileCache {
    transactions: Vec<Transaction>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, id: i64) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Adds `transaction` unless a transaction with the same id is already present.
    pub fn add(&mut self, transaction: Transaction) {
        if self.get(transaction.id).is_some() {
            return;
        }
        self.transactions.push(transaction);
    }

    pub fn remove(&mut self, id: i64) {
        self.transactions.retain(|t| t.id != id);
    }

    /// Replaces the whole list, dropping duplicate ids (first seen wins).
    pub fn replace_all(&mut self, transactions: Vec<Transaction>) {
        self.transactions = dedup_by_id(transactions);
    }

    /// Writes the list as a pretty JSON array.
    pub async fn save(&self, path: &Path) -> Res<()> {
        utils::serialize(path, &self.transactions)
            .await
            .context("Unable to save the transactions cache")
    }

    /// Replaces the list with the contents of `path`.
    ///
    /// - A missing file loads as an empty list.
    /// - A file that is not a JSON array is an error.
    /// - Elements that do not decode as transactions are skipped with a warning.
    /// - Duplicate ids collapse to the first occurrence.
    pub async fn load(&mut self, path: &Path) -> Res<()> {
        if !utils::exists(path).await? {
            debug!("No cache file at {}, starting empty", path.display());
            self.transactions.clear();
            return Ok(());
        }
        let value: serde_json::Value = utils::deserialize(path).await?;
        let serde_json::Value::Array(items) = value else {
            bail!(
                "The cache file at {} does not contain a JSON array",
                path.display()
            );
        };
        let mut loaded = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<Transaction>(item) {
                Ok(t) => loaded.push(t),
                Err(e) => warn!("Skipping unparseable cached transaction: {e}"),
            }
        }
        self.replace_all(loaded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_transaction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_preserves_transactions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = FileCache::new();
        cache.add(sample_transaction(1, "500.00"));
        cache.add(sample_transaction(2, "150.00"));
        cache.save(&path).await.unwrap();

        let mut loaded = FileCache::new();
        loaded.load(&path).await.unwrap();
        assert_eq!(loaded, cache);
    }

    #[tokio::test]
    async fn test_load_deduplicates_by_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let first = sample_transaction(1, "500.00");
        let mut dupe = first.clone();
        dupe.comment = Some("dupe".to_string());
        utils::serialize(&path, &vec![first.clone(), dupe])
            .await
            .unwrap();

        let mut cache = FileCache::new();
        cache.load(&path).await.unwrap();
        assert_eq!(cache.transactions(), &[first]);
    }

    #[tokio::test]
    async fn test_load_skips_bad_elements() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let good = serde_json::to_value(sample_transaction(1, "1")).unwrap();
        let json = serde_json::json!([good, {"bad": "data"}, "nope"]);
        utils::write(&path, json.to_string()).await.unwrap();

        let mut cache = FileCache::new();
        cache.load(&path).await.unwrap();
        assert_eq!(cache.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_non_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        utils::write(&path, r#"{"id": 1}"#).await.unwrap();
        assert!(FileCache::new().load(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileCache::new();
        cache.add(sample_transaction(1, "1"));
        cache.load(&dir.path().join("missing.json")).await.unwrap();
        assert!(cache.transactions().is_empty());
    }

    #[test]
    fn test_add_is_noop_for_existing_id() {
        let mut cache = FileCache::new();
        cache.add(sample_transaction(1, "1"));
        cache.add(sample_transaction(1, "2"));
        assert_eq!(cache.transactions().len(), 1);
        assert_eq!(cache.transactions()[0].amount.to_string(), "1");
        cache.remove(1);
        assert!(cache.transactions().is_empty());
    }
}

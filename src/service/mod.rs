//! The transaction sync service.
//!
//! Reads always try to bring the remote up to date first by replaying the outbox, then fetch the
//! requested window. When the remote cannot be reached the answer is assembled from the local
//! mirror and the pending outbox. Writes go to the remote first and fall back to the outbox.

mod drain;
mod offline;

pub use drain::DrainReport;

use crate::api::{self, Mode, Remote};
use crate::error::{Error, ErrorType, IntoResult, Result};
use crate::model::{
    codec, Account, Category, CreatedTransaction, OutboxAction, OutboxEntry, Transaction,
    TransactionRequest,
};
use crate::store::{FileCache, LocalStore, OutboxStore, PlaceholderIds, Storage};
use crate::Config;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Orchestrates the remote, the cache, the mirror and the outbox. All operations are serialized.
pub struct TransactionService {
    inner: Mutex<Inner>,
}

struct Inner {
    remote: Arc<dyn Remote>,
    local: Arc<dyn LocalStore>,
    outbox: Arc<dyn OutboxStore>,
    cache: FileCache,
    cache_path: PathBuf,
    ids: PlaceholderIds,
    currency: String,
}

impl TransactionService {
    /// Creates the service and loads the cache from `cache_path`. An unreadable cache is logged
    /// and replaced by an empty one.
    pub async fn new(
        remote: Arc<dyn Remote>,
        storage: &Storage,
        cache_path: impl Into<PathBuf>,
        currency: impl Into<String>,
    ) -> Self {
        let cache_path = cache_path.into();
        let mut cache = FileCache::new();
        if let Err(e) = cache.load(&cache_path).await {
            warn!("Starting with an empty cache: {e:#}");
        }
        Self {
            inner: Mutex::new(Inner {
                remote,
                local: storage.local(),
                outbox: storage.outbox(),
                cache,
                cache_path,
                ids: PlaceholderIds::new(),
                currency: currency.into(),
            }),
        }
    }

    /// Creates the service from the configured remote, storage backend and cache file.
    pub async fn from_config(config: &Config, mode: Mode) -> Result<Self> {
        let remote = api::remote(config, mode).await?;
        let storage = config
            .open_storage()
            .await
            .pub_result(ErrorType::Persistence)?;
        Ok(Self::new(remote, &storage, config.cache_path(), config.currency()).await)
    }

    /// Returns the transactions of `account_id` dated within `[start, end]`. Reversed bounds are
    /// swapped.
    ///
    /// The outbox is replayed first. If the remote then answers, its list replaces the cache and
    /// the mirror, and the part of it inside the window is returned. Otherwise the list is built from the mirror overlaid with pending outbox
    /// snapshots. This never fails.
    pub async fn get_transactions(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Transaction> {
        let (start, end) = if start > end {
            (end, start)
        } else {
            (start, end)
        };
        let mut inner = self.inner.lock().await;
        inner.drain().await;

        match inner
            .remote
            .list_transactions(account_id, &start, &end)
            .await
        {
            Ok(fetched) => {
                inner.cache.replace_all(fetched);
                inner.save_cache().await;
                let fresh = inner.cache.transactions().to_vec();
                if let Err(e) = inner.local.replace_all(&fresh).await {
                    warn!("Unable to refresh the local store: {e:#}");
                }
                // The remote window has day granularity.
                fresh
                    .into_iter()
                    .filter(|t| t.matches(account_id, &start, &end))
                    .collect()
            }
            Err(e) => {
                warn!("Serving transactions from local storage: {e}");
                inner.offline_list(account_id, &start, &end).await
            }
        }
    }

    /// Creates a transaction remotely and records it locally.
    ///
    /// If the remote cannot be reached, a placeholder with a fresh negative id is stored in the
    /// mirror and queued for replay, and the error is returned.
    pub async fn create_transaction(&self, request: TransactionRequest) -> Result<Transaction> {
        let mut inner = self.inner.lock().await;
        let created = match inner.remote.create_transaction(&request).await {
            Ok(created) => created,
            Err(e) => {
                if e.is_network() {
                    inner.queue_create(&request).await;
                }
                return Err(e);
            }
        };

        let transaction = inner.hydrate(created).await?;

        inner.cache.add(transaction.clone());
        inner.save_cache().await;
        inner.mirror(&transaction).await;
        inner.dequeue_quietly(transaction.id).await;
        Ok(transaction)
    }

    /// Updates a transaction.
    ///
    /// An update of a transaction whose create is still queued is folded into the queued create
    /// and never sent on its own. A transaction with a queued delete cannot be updated. If the
    /// remote cannot be reached, the update is queued and the error is returned.
    pub async fn update_transaction(
        &self,
        id: i64,
        request: TransactionRequest,
    ) -> Result<Transaction> {
        let mut inner = self.inner.lock().await;
        match inner.pending_entry(id).await? {
            Some(pending) if pending.action == OutboxAction::Create => {
                return inner.fold_into_create(pending, &request).await;
            }
            Some(pending) if pending.action == OutboxAction::Delete => {
                return Err(Error::msg(
                    ErrorType::NotFound,
                    format!("Transaction {id} is queued for deletion"),
                ));
            }
            _ => {}
        }

        match inner.remote.update_transaction(id, &request).await {
            Ok(updated) => {
                inner.cache.remove(id);
                inner.cache.add(updated.clone());
                inner.save_cache().await;
                inner.mirror(&updated).await;
                inner.dequeue_quietly(id).await;
                Ok(updated)
            }
            Err(e) if !e.is_network() => Err(e),
            Err(e) => {
                let known = inner.known(id).await;
                let created_at = known
                    .as_ref()
                    .map(|t| t.created_at)
                    .unwrap_or_else(codec::now);
                let (account, category) = inner
                    .snapshots(known.as_ref(), request.account_id, request.category_id)
                    .await;
                let snapshot = offline::materialize(id, &request, account, category, created_at);
                inner
                    .enqueue(OutboxEntry::new(OutboxAction::Update, snapshot))
                    .await;
                Err(e)
            }
        }
    }

    /// Deletes a transaction.
    ///
    /// Deleting a transaction whose create is still queued cancels the create; the remote is not
    /// contacted. If the remote cannot be reached, the delete is queued and the error is returned.
    pub async fn delete_transaction(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let pending = inner.pending_entry(id).await?;
        if pending.is_some_and(|e| e.action == OutboxAction::Create) {
            debug!("Cancelling queued create of {id}");
            inner
                .outbox
                .delete(id)
                .await
                .pub_result(ErrorType::Persistence)?;
            inner.forget(id).await;
            return Ok(());
        }

        match inner.remote.delete_transaction(id).await {
            Ok(()) => {
                inner.forget(id).await;
                inner.dequeue_quietly(id).await;
                Ok(())
            }
            Err(e) if !e.is_network() => Err(e),
            Err(e) => {
                let snapshot = match inner.known(id).await {
                    Some(t) => t,
                    None => offline::unknown(id, &inner.currency),
                };
                inner
                    .enqueue(OutboxEntry::new(OutboxAction::Delete, snapshot))
                    .await;
                Err(e)
            }
        }
    }

    /// Replays the outbox without fetching anything.
    pub async fn sync_outbox(&self) -> DrainReport {
        self.inner.lock().await.drain().await
    }

    /// The writes waiting to be replayed, in queue order.
    pub async fn pending(&self) -> Result<Vec<OutboxEntry>> {
        let inner = self.inner.lock().await;
        inner
            .outbox
            .get_all()
            .await
            .pub_result(ErrorType::Persistence)
    }

    /// The last known-good list.
    pub async fn cached(&self) -> Vec<Transaction> {
        self.inner.lock().await.cache.transactions().to_vec()
    }

    /// The freshest local copy of `id`, including queued offline edits.
    pub async fn find(&self, id: i64) -> Option<Transaction> {
        self.inner.lock().await.known(id).await
    }

    /// The remote category list.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let inner = self.inner.lock().await;
        inner.remote.categories().await
    }

    /// Writes `transactions` into the cache and the mirror without contacting the remote. Records
    /// with an id that is already known locally are replaced.
    pub async fn import_local(&self, transactions: Vec<Transaction>) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let count = transactions.len();
        for t in transactions {
            inner
                .local
                .create(&t)
                .await
                .pub_result(ErrorType::Persistence)?;
            inner.cache.remove(t.id);
            inner.cache.add(t);
        }
        inner
            .cache
            .save(&inner.cache_path)
            .await
            .pub_result(ErrorType::Persistence)?;
        Ok(count)
    }
}

impl Inner {
    async fn save_cache(&self) {
        if let Err(e) = self.cache.save(&self.cache_path).await {
            warn!("{e:#}");
        }
    }

    /// Writes `transaction` to the mirror, inserting it if the mirror does not have it yet.
    async fn mirror(&self, transaction: &Transaction) {
        let result = match self.local.get(transaction.id).await {
            Ok(Some(_)) => self.local.update(transaction).await,
            Ok(None) => self.local.create(transaction).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                "Unable to mirror transaction {} locally: {e:#}",
                transaction.id
            );
        }
    }

    /// Removes `id` from the cache and the mirror.
    async fn forget(&mut self, id: i64) {
        self.cache.remove(id);
        self.save_cache().await;
        if let Err(e) = self.local.delete(id).await {
            warn!("Unable to remove transaction {id} from the local store: {e:#}");
        }
    }

    async fn enqueue(&self, entry: OutboxEntry) {
        debug!("Queueing {} of {}", entry.action, entry.id);
        if let Err(e) = self.outbox.save(&entry).await {
            warn!("Unable to queue {} of {}: {e:#}", entry.action, entry.id);
        }
    }

    async fn dequeue_quietly(&self, id: i64) {
        if let Err(e) = self.outbox.delete(id).await {
            warn!("Unable to clear outbox entry {id}: {e:#}");
        }
    }

    async fn pending_entry(&self, id: i64) -> Result<Option<OutboxEntry>> {
        let entries = self
            .outbox
            .get_all()
            .await
            .pub_result(ErrorType::Persistence)?;
        Ok(entries.into_iter().find(|e| e.id == id))
    }

    /// The freshest local copy of `id`: a queued snapshot, then the cache, then the mirror.
    async fn known(&self, id: i64) -> Option<Transaction> {
        if let Ok(entries) = self.outbox.get_all().await {
            if let Some(entry) = entries.into_iter().find(|e| e.id == id) {
                return Some(entry.transaction);
            }
        }
        if let Some(t) = self.cache.get(id) {
            return Some(t.clone());
        }
        self.local.get(id).await.ok().flatten()
    }

    /// Account and category snapshots for a locally built record. `base` is reused when its ids
    /// still match; otherwise the snapshots are borrowed from other local records.
    async fn snapshots(
        &self,
        base: Option<&Transaction>,
        account_id: i64,
        category_id: i64,
    ) -> (Account, Category) {
        let mirrored = match self.local.get_all().await {
            Ok(all) => all,
            Err(e) => {
                warn!("Unable to read the local store: {e:#}");
                Vec::new()
            }
        };
        offline::borrow_snapshots(
            base.into_iter()
                .chain(self.cache.transactions())
                .chain(mirrored.iter()),
            account_id,
            category_id,
            &self.currency,
        )
    }

    /// Looks up the account and category of a freshly created record.
    async fn hydrate(&self, created: CreatedTransaction) -> Result<Transaction> {
        let account = self.remote.account(created.account_id).await?;
        let category = self.find_category(created.category_id).await?;
        Ok(created.hydrate(account, category))
    }

    async fn find_category(&self, id: i64) -> Result<Category> {
        self.remote
            .categories()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::msg(ErrorType::NotFound, format!("Category {id} not found")))
    }

    async fn queue_create(&mut self, request: &TransactionRequest) {
        let id = match self.ids.allocate(&*self.local, &*self.outbox).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Unable to allocate a placeholder id, the create is not queued: {e:#}");
                return;
            }
        };
        let (account, category) = self
            .snapshots(None, request.account_id, request.category_id)
            .await;
        let placeholder = offline::materialize(id, request, account, category, codec::now());
        if let Err(e) = self.local.create(&placeholder).await {
            warn!("Unable to store placeholder {id}: {e:#}");
        }
        self.enqueue(OutboxEntry::new(OutboxAction::Create, placeholder))
            .await;
    }

    async fn fold_into_create(
        &mut self,
        pending: OutboxEntry,
        request: &TransactionRequest,
    ) -> Result<Transaction> {
        let id = pending.id;
        debug!("Folding update of {id} into its queued create");
        let (account, category) = self
            .snapshots(
                Some(&pending.transaction),
                request.account_id,
                request.category_id,
            )
            .await;
        let updated = offline::materialize(
            id,
            request,
            account,
            category,
            pending.transaction.created_at,
        );
        self.outbox
            .save(&OutboxEntry::new(OutboxAction::Create, updated.clone()))
            .await
            .pub_result(ErrorType::Persistence)?;
        self.mirror(&updated).await;
        Ok(updated)
    }

    async fn offline_list(
        &self,
        account_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Vec<Transaction> {
        let mirrored = self.local.get_all().await.unwrap_or_else(|e| {
            warn!("Unable to read the local store: {e:#}");
            Vec::new()
        });
        let pending = self.outbox.get_all().await.unwrap_or_else(|e| {
            warn!("Unable to read the outbox: {e:#}");
            Vec::new()
        });
        offline::merge(mirrored, &pending)
            .into_iter()
            .filter(|t| t.matches(account_id, start, end))
            .collect()
    }
}

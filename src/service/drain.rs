use super::Inner;
use crate::model::{OutboxAction, OutboxEntry};
use serde::Serialize;
use tracing::{debug, info, warn};

/// The outcome of one pass over the outbox.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct DrainReport {
    /// Entries that reached the remote and were removed from the outbox.
    pub replayed: usize,
    /// Entries that failed and stay queued.
    pub failed: usize,
    /// Updates discarded because the remote no longer has the record.
    pub dropped: usize,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.replayed == 0 && self.failed == 0 && self.dropped == 0
    }
}

enum Replay {
    Done,
    Dropped,
    Failed,
}

impl Inner {
    /// Replays every outbox entry in queue order. Failures are logged and leave the entry queued;
    /// the pass never stops early.
    pub(super) async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let entries = match self.outbox.get_all().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Unable to read the outbox, skipping replay: {e:#}");
                return report;
            }
        };
        if entries.is_empty() {
            return report;
        }
        debug!("Replaying {} outbox entries", entries.len());

        for entry in &entries {
            match self.replay(entry).await {
                Replay::Done => {
                    report.replayed += 1;
                    self.dequeue(entry.id).await;
                }
                Replay::Dropped => {
                    report.dropped += 1;
                    self.dequeue(entry.id).await;
                }
                Replay::Failed => report.failed += 1,
            }
        }

        info!(
            "Outbox replay: {} replayed, {} failed, {} dropped",
            report.replayed, report.failed, report.dropped
        );
        report
    }

    async fn replay(&mut self, entry: &OutboxEntry) -> Replay {
        let id = entry.id;
        match entry.action {
            OutboxAction::Create => {
                match self
                    .remote
                    .create_transaction(&entry.transaction.to_request())
                    .await
                {
                    Ok(created) => {
                        debug!("Placeholder {id} created remotely as {}", created.id);
                        if let Err(e) = self.local.delete(id).await {
                            warn!("Unable to remove placeholder {id} from the local store: {e:#}");
                        }
                        self.cache.remove(id);
                        let server_id = created.id;
                        match self.hydrate(created).await {
                            Ok(transaction) => {
                                self.mirror(&transaction).await;
                                self.cache.add(transaction);
                            }
                            Err(e) => {
                                warn!("Transaction {server_id} arrives with the next fetch: {e}")
                            }
                        }
                        self.save_cache().await;
                        Replay::Done
                    }
                    Err(e) => {
                        warn!("Replaying create of {id} failed: {e}");
                        Replay::Failed
                    }
                }
            }
            OutboxAction::Update => {
                match self
                    .remote
                    .update_transaction(id, &entry.transaction.to_request())
                    .await
                {
                    Ok(_) => Replay::Done,
                    Err(e) if e.is_not_found() => {
                        warn!("Dropping update of {id}, the remote no longer has it");
                        Replay::Dropped
                    }
                    Err(e) => {
                        warn!("Replaying update of {id} failed: {e}");
                        Replay::Failed
                    }
                }
            }
            OutboxAction::Delete => match self.remote.delete_transaction(id).await {
                Ok(()) => Replay::Done,
                Err(e) if e.is_not_found() => {
                    debug!("Transaction {id} was already deleted remotely");
                    Replay::Done
                }
                Err(e) => {
                    warn!("Replaying delete of {id} failed: {e}");
                    Replay::Failed
                }
            },
        }
    }

    async fn dequeue(&self, id: i64) {
        if let Err(e) = self.outbox.delete(id).await {
            warn!("Unable to remove outbox entry {id}: {e:#}");
        }
    }
}

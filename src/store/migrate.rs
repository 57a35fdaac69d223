use crate::backup::{self, Backup};
use crate::error::Res;
use crate::model::{OutboxEntry, Transaction};
use crate::store::{Storage, StorageMode};
use anyhow::{bail, Context};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// The totals copied by `migrate`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MigrationReport {
    pub from: StorageMode,
    pub to: StorageMode,
    pub transactions: usize,
    pub outbox_entries: usize,
    pub backup: PathBuf,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    storage: StorageMode,
    transactions: &'a [Transaction],
    outbox: &'a [OutboxEntry],
}

/// Copies the mirror and the outbox from `from` to `to`.
///
/// The source is snapshotted to a backup file first. The target mirror is replaced wholesale and
/// every outbox entry is saved to the target in queue order. The source is left untouched.
pub async fn migrate(from: &Storage, to: &Storage, backup: &Backup) -> Res<MigrationReport> {
    if from.mode() == to.mode() {
        bail!("Storage is already '{}'", from.mode());
    }

    let transactions = from
        .local()
        .get_all()
        .await
        .context("Unable to read the source mirror")?;
    let outbox = from
        .outbox()
        .get_all()
        .await
        .context("Unable to read the source outbox")?;

    let backup_path = backup
        .save_json(
            backup::MIGRATE,
            &Snapshot {
                storage: from.mode(),
                transactions: &transactions,
                outbox: &outbox,
            },
        )
        .await?;
    info!("Saved storage snapshot to {}", backup_path.display());

    to.local()
        .replace_all(&transactions)
        .await
        .context("Unable to write the target mirror")?;

    let target_outbox = to.outbox();
    for stale in target_outbox.get_all().await? {
        target_outbox.delete(stale.id).await?;
    }
    for entry in &outbox {
        target_outbox
            .save(entry)
            .await
            .with_context(|| format!("Unable to copy outbox entry {}", entry.id))?;
    }

    Ok(MigrationReport {
        from: from.mode(),
        to: to.mode(),
        transactions: transactions.len(),
        outbox_entries: outbox.len(),
        backup: backup_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutboxAction;
    use crate::test::sample_transaction;
    use crate::utils;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_migrate_copies_mirror_and_outbox() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        utils::make_dir(&backups).await.unwrap();
        let backup = Backup::with_dir(&backups, 3);

        let json = Storage::open(dir.path(), StorageMode::Json).await.unwrap();
        let sqlite = Storage::open(dir.path(), StorageMode::Sqlite).await.unwrap();

        json.local()
            .create(&sample_transaction(1, "500"))
            .await
            .unwrap();
        json.local()
            .create(&sample_transaction(-1, "200"))
            .await
            .unwrap();
        let create = OutboxEntry::new(OutboxAction::Create, sample_transaction(-1, "200"));
        let delete = OutboxEntry::new(OutboxAction::Delete, sample_transaction(9, "1"));
        json.outbox().save(&create).await.unwrap();
        json.outbox().save(&delete).await.unwrap();

        let report = migrate(&json, &sqlite, &backup).await.unwrap();
        assert_eq!(report.transactions, 2);
        assert_eq!(report.outbox_entries, 2);
        assert!(utils::exists(&report.backup).await.unwrap());

        let mut ids: Vec<i64> = sqlite
            .local()
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![-1, 1]);
        assert_eq!(sqlite.outbox().get_all().await.unwrap(), vec![create, delete]);

        // The source is left as it was.
        assert_eq!(json.local().get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_migrate_to_same_mode_fails() {
        let dir = TempDir::new().unwrap();
        let backup = Backup::with_dir(dir.path(), 3);
        let json = Storage::open(dir.path(), StorageMode::Json).await.unwrap();
        assert!(migrate(&json, &json, &backup).await.is_err());
    }
}

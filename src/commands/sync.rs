use crate::api::Mode;
use crate::commands::{plural, Out};
use crate::model::OutboxEntry;
use crate::{Config, DrainReport, Result, TransactionService};
use std::fmt::Write;

/// Replays queued offline writes against the backend. Entries that fail stay queued for the next
/// attempt, so this only errors if the service cannot be built.
pub async fn sync(config: Config, mode: Mode) -> Result<Out<DrainReport>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let report = service.sync_outbox().await;
    let message = if report.is_empty() {
        "Nothing to sync".to_string()
    } else {
        format!(
            "Replayed {}, {} still queued, {} dropped",
            plural(report.replayed, "write"),
            report.failed,
            report.dropped
        )
    };
    Ok(Out::new(message, report))
}

/// Lists the queued offline writes in the order they will be replayed.
pub async fn pending(config: Config, mode: Mode) -> Result<Out<Vec<OutboxEntry>>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let entries = service.pending().await?;
    let mut message = format!("{} queued", plural(entries.len(), "write"));
    for entry in &entries {
        let t = &entry.transaction;
        let _ = write!(
            message,
            "\n{:<6} {:>6}  {} {}",
            entry.action, entry.id, t.amount, t.category.name
        );
    }
    Ok(Out::new(message, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutboxAction;
    use crate::test::{request, TestEnv};

    #[tokio::test]
    async fn test_pending_then_sync() {
        let env = TestEnv::new().await;
        env.remote().set_online(false);
        let service = env.service().await;
        let _ = service
            .create_transaction(request(1, "500.00", "2025-06-02T09:00:00Z"))
            .await;
        let _ = service
            .create_transaction(request(3, "200.00", "2025-06-03T19:00:00Z"))
            .await;
        drop(service);

        let out = pending(env.config(), Mode::Test).await.unwrap();
        let entries = out.structure().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.action == OutboxAction::Create));
        assert_eq!(entries[0].id, -1);
        assert_eq!(entries[1].id, -2);

        // Still offline: nothing replays and both entries stay.
        let out = sync(env.config(), Mode::Test).await.unwrap();
        assert_eq!(out.structure().unwrap().failed, 2);

        env.remote().set_online(true);
        let out = sync(env.config(), Mode::Test).await.unwrap();
        assert_eq!(out.structure().unwrap().replayed, 2);
        assert_eq!(env.remote().state().transactions.len(), 2);

        let out = pending(env.config(), Mode::Test).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
        let out = sync(env.config(), Mode::Test).await.unwrap();
        assert_eq!(out.message(), "Nothing to sync");
    }
}

//! Delete command handler.

use crate::api::Mode;
use crate::args::DeleteArgs;
use crate::commands::Out;
use crate::{Config, Result, TransactionService};
use tracing::warn;

/// Deletes a transaction by id. A transaction that only exists as a queued offline create is
/// dropped locally without contacting the backend.
pub async fn delete(config: Config, mode: Mode, args: &DeleteArgs) -> Result<Out<i64>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let id = args.id();
    match service.delete_transaction(id).await {
        Ok(()) => Ok(Out::new(format!("Deleted transaction {id}"), id)),
        Err(e) => {
            if e.is_network() {
                warn!("The delete was queued and will be sent by the next sync");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteCall;
    use crate::test::{request, TestEnv};

    #[tokio::test]
    async fn test_delete() {
        let env = TestEnv::new().await;
        let created = env
            .service()
            .await
            .create_transaction(request(1, "10", "2025-06-02T09:00:00Z"))
            .await
            .unwrap();

        delete(env.config(), Mode::Test, &DeleteArgs::new(created.id))
            .await
            .unwrap();
        assert!(env.remote().state().transactions.is_empty());

        let err = delete(env.config(), Mode::Test, &DeleteArgs::new(created.id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_offline_is_queued() {
        let env = TestEnv::new().await;
        let created = env
            .service()
            .await
            .create_transaction(request(1, "10", "2025-06-02T09:00:00Z"))
            .await
            .unwrap();
        env.remote().set_online(false);

        let err = delete(env.config(), Mode::Test, &DeleteArgs::new(created.id))
            .await
            .unwrap_err();
        assert!(err.is_network());

        env.remote().set_online(true);
        let report = env.service().await.sync_outbox().await;
        assert_eq!(report.replayed, 1);
        assert_eq!(
            env.remote().state().calls,
            vec![RemoteCall::Create, RemoteCall::Delete(created.id)]
        );
    }
}

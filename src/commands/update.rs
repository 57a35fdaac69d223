//! Update command handler.

use crate::api::Mode;
use crate::args::UpdateArgs;
use crate::commands::insert::resolve_category;
use crate::commands::Out;
use crate::error::{Error, ErrorType};
use crate::model::{Transaction, TransactionRequest};
use crate::{Config, Result, TransactionService};
use tracing::warn;

/// Updates a transaction. Fields that are not given keep the values of the freshest local copy.
///
/// # Errors
/// - Returns a `Validation` error if a field is omitted and the transaction is not known locally.
/// - Returns the network error when the backend cannot be reached. The update is queued anyway.
pub async fn update(config: Config, mode: Mode, args: &UpdateArgs) -> Result<Out<Transaction>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let request = build_request(&service, args).await?;

    match service.update_transaction(args.id(), request).await {
        Ok(updated) => Ok(Out::new(
            format!("Updated transaction {}", updated.id),
            updated,
        )),
        Err(e) => {
            if e.is_network() {
                warn!("The update was queued and will be sent by the next sync");
            }
            Err(e)
        }
    }
}

async fn build_request(service: &TransactionService, args: &UpdateArgs) -> Result<TransactionRequest> {
    let current = service.find(args.id()).await.map(|t| t.to_request());
    let missing = |field: &str| {
        Error::msg(
            ErrorType::Validation,
            format!(
                "Transaction {} is not known locally, so --{field} must be given",
                args.id()
            ),
        )
    };

    let category_id = match args.category() {
        Some(category) => resolve_category(service, category).await?,
        None => current
            .as_ref()
            .map(|r| r.category_id)
            .ok_or_else(|| missing("category"))?,
    };
    let account_id = match args.account() {
        Some(id) => id,
        None => current
            .as_ref()
            .map(|r| r.account_id)
            .ok_or_else(|| missing("account"))?,
    };
    let amount = match args.amount() {
        Some(amount) => amount,
        None => current
            .as_ref()
            .map(|r| r.amount)
            .ok_or_else(|| missing("amount"))?,
    };
    let transaction_date = match args.date() {
        Some(date) => date,
        None => current
            .as_ref()
            .map(|r| r.transaction_date)
            .ok_or_else(|| missing("date"))?,
    };
    let comment = match args.comment() {
        Some(comment) => Some(comment.to_string()),
        None => current.and_then(|r| r.comment),
    };

    Ok(TransactionRequest {
        account_id,
        category_id,
        amount,
        transaction_date,
        comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteCall;
    use crate::model::Amount;
    use crate::test::{request, TestEnv};
    use std::str::FromStr;

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let env = TestEnv::new().await;
        let created = env
            .service()
            .await
            .create_transaction(request(1, "500.00", "2025-06-02T09:00:00Z"))
            .await
            .unwrap();

        let args = UpdateArgs::new(created.id)
            .with_amount(Amount::from_str("450.00").unwrap())
            .with_comment("Corrected");
        let out = update(env.config(), Mode::Test, &args).await.unwrap();
        let updated = out.structure().unwrap();
        assert_eq!(updated.amount.to_string(), "450.00");
        assert_eq!(updated.category.id, 1);
        assert_eq!(updated.transaction_date, created.transaction_date);
        assert_eq!(updated.comment.as_deref(), Some("Corrected"));
        assert_eq!(
            env.remote().state().calls,
            vec![RemoteCall::Create, RemoteCall::Update(created.id)]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_needs_every_field() {
        let env = TestEnv::new().await;
        let args = UpdateArgs::new(77).with_category("1");
        let err = update(env.config(), Mode::Test, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorType::Validation);
        assert!(env.remote().state().calls.is_empty());
    }
}

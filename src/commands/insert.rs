//! Insert command handler.

use crate::api::Mode;
use crate::args::CreateArgs;
use crate::commands::Out;
use crate::error::{Error, ErrorType};
use crate::model::{codec, search_categories, Transaction, TransactionRequest};
use crate::{Config, Result, TransactionService};
use tracing::{debug, warn};

/// Creates a transaction.
///
/// When the backend cannot be reached the transaction is stored locally under a negative
/// placeholder id and queued; the network error is still returned so that the caller knows the
/// write has not landed yet.
pub async fn create(config: Config, mode: Mode, args: &CreateArgs) -> Result<Out<Transaction>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let request = TransactionRequest {
        account_id: args.account().unwrap_or(config.account_id()),
        category_id: resolve_category(&service, args.category()).await?,
        amount: args.amount(),
        transaction_date: args.date().unwrap_or_else(codec::now),
        comment: args.comment().map(str::to_string),
    };

    match service.create_transaction(request).await {
        Ok(created) => Ok(Out::new(
            format!("Created transaction {}", created.id),
            created,
        )),
        Err(e) => {
            if e.is_network() {
                warn!("The create was queued and will be sent by the next sync");
            }
            Err(e)
        }
    }
}

/// Turns a category argument into an id. A number is taken as the id itself; anything else is
/// matched against the backend's category names and the best match wins.
pub(super) async fn resolve_category(service: &TransactionService, category: &str) -> Result<i64> {
    if let Ok(id) = category.trim().parse::<i64>() {
        return Ok(id);
    }
    let categories = service.categories().await?;
    match search_categories(&categories, category).first() {
        Some(found) => {
            debug!("Category '{category}' resolved to {} ({})", found.name, found.id);
            Ok(found.id)
        }
        None => Err(Error::msg(
            ErrorType::Validation,
            format!("No category matches '{category}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use crate::test::{date, TestEnv};
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_by_category_name() {
        let env = TestEnv::new().await;
        let args = CreateArgs::new("groc", amount("500.00"))
            .with_date(date("2025-06-02T09:00:00Z"))
            .with_comment("Market");
        let out = create(env.config(), Mode::Test, &args).await.unwrap();
        let created = out.structure().unwrap();
        assert_eq!(created.category.name, "Groceries");
        assert_eq!(created.account.id, 1);
        assert_eq!(created.comment.as_deref(), Some("Market"));
        assert_eq!(env.remote().state().transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_create_unknown_category_name() {
        let env = TestEnv::new().await;
        let args = CreateArgs::new("zzz", amount("1"));
        let err = create(env.config(), Mode::Test, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorType::Validation);
        assert!(env.remote().state().calls.is_empty());
    }

    #[tokio::test]
    async fn test_create_offline_is_queued() {
        let env = TestEnv::new().await;
        env.remote().set_online(false);
        let args = CreateArgs::new("1", amount("42"));
        let err = create(env.config(), Mode::Test, &args).await.unwrap_err();
        assert!(err.is_network());

        let pending = env.service().await.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, -1);
    }
}

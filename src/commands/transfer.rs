//! CSV export and import.

use crate::api::Mode;
use crate::args::{ExportArgs, ImportArgs};
use crate::backup::IMPORT;
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::csv::{from_csv, to_csv};
use crate::{utils, Config, Result, TransactionService};
use std::path::PathBuf;
use tracing::debug;

/// Writes the transactions of a window to a CSV file.
pub async fn export(config: Config, mode: Mode, args: &ExportArgs) -> Result<Out<PathBuf>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let (start, end) = args.range().bounds();
    let account_id = args.range().account().unwrap_or(config.account_id());
    let transactions = service.get_transactions(account_id, start, end).await;

    let data = to_csv(&transactions).pub_result(ErrorType::Decoding)?;
    utils::write(args.out(), data)
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(
        format!(
            "Exported {} to {}",
            plural(transactions.len(), "transaction"),
            args.out().display()
        ),
        args.out().to_path_buf(),
    ))
}

/// Loads a CSV file written by `export` into the local cache and mirror. The backend is not
/// contacted. A backup of the parsed records is written first.
pub async fn import(config: Config, mode: Mode, args: &ImportArgs) -> Result<Out<usize>> {
    let data = utils::read(args.file())
        .await
        .pub_result(ErrorType::Persistence)?;
    let transactions = from_csv(&data).pub_result(ErrorType::Decoding)?;

    let backup_path = config
        .backup()
        .save_json(IMPORT, &transactions)
        .await
        .pub_result(ErrorType::Persistence)?;
    debug!("Saved import backup to {}", backup_path.display());

    let service = TransactionService::from_config(&config, mode).await?;
    let count = service.import_local(transactions).await?;
    Ok(Out::new(
        format!(
            "Imported {} from {}",
            plural(count, "transaction"),
            args.file().display()
        ),
        count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::RangeArgs;
    use crate::store::StorageMode;
    use crate::test::{request, TestEnv};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_export_then_import_elsewhere() {
        let env = TestEnv::new().await;
        let service = env.service().await;
        for (category, amount, at) in [
            (1, "500.00", "2025-06-02T09:00:00Z"),
            (3, "200.00", "2025-06-03T19:00:00Z"),
        ] {
            service
                .create_transaction(request(category, amount, at))
                .await
                .unwrap();
        }

        let file = env.config().root().join("june.csv");
        let range = RangeArgs::new(
            None,
            NaiveDate::from_ymd_opt(2025, 6, 1),
            NaiveDate::from_ymd_opt(2025, 6, 30),
        );
        export(env.config(), Mode::Test, &ExportArgs::new(&file, range))
            .await
            .unwrap();
        let written = tokio::fs::read_to_string(&file).await.unwrap();
        assert_eq!(written.lines().count(), 3);

        let other = TestEnv::with_storage(StorageMode::Sqlite).await;
        let out = import(other.config(), Mode::Test, &ImportArgs::new(&file))
            .await
            .unwrap();
        assert_eq!(*out.structure().unwrap(), 2);

        let imported = other.service().await.cached().await;
        assert_eq!(imported.len(), 2);
        let mut expected = service.cached().await;
        expected.sort_by_key(|t| t.id);
        let mut imported = imported;
        imported.sort_by_key(|t| t.id);
        assert_eq!(imported, expected);
        assert!(other.remote().state().calls.is_empty());
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let env = TestEnv::new().await;
        let err = import(env.config(), Mode::Test, &ImportArgs::new("/nonexistent/x.csv"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorType::Persistence);
    }
}

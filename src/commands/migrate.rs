use crate::args::MigrateArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::store::{self, MigrationReport};
use crate::{Config, Result};

/// Copies the local copy and the outbox to another storage backend, then points the
/// configuration at it. The old backend's files are left in place.
pub async fn migrate(mut config: Config, args: &MigrateArgs) -> Result<Out<MigrationReport>> {
    let from = config.open_storage().await.pub_result(ErrorType::Persistence)?;
    let to = config
        .open_storage_as(args.to())
        .await
        .pub_result(ErrorType::Persistence)?;
    let report = store::migrate(&from, &to, &config.backup())
        .await
        .pub_result(ErrorType::Persistence)?;
    config
        .set_storage(args.to())
        .await
        .pub_result(ErrorType::Config)?;

    Ok(Out::new(
        format!(
            "Moved {} transactions and {} queued writes from {} to {}",
            report.transactions, report.outbox_entries, report.from, report.to
        ),
        report,
    ))
}

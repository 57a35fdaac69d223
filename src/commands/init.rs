use crate::args::InitArgs;
use crate::commands::Out;
use crate::config::InitSettings;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories, an initial `config.json` and the configured
/// storage backend.
///
/// # Arguments
/// - `finsync_home` - The directory that will be the root of data directory, e.g. `$HOME/finsync`
/// - `args` - The backend URL, default account, offline currency and storage backend.
///
/// # Errors
/// - Returns an error if the directory already holds a configuration or any file operation fails.
pub async fn init(finsync_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let settings = InitSettings {
        base_url: args.base_url().to_string(),
        account_id: args.account_id(),
        currency: args.currency().map(str::to_string),
        storage: args.storage(),
    };
    let config = Config::create(finsync_home, settings)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the finsync directory at {} using {} storage",
        config.root().display(),
        config.storage()
    )
    .into())
}

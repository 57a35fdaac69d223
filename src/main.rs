use clap::Parser;
use finsync::args::{Args, Command};
use finsync::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().finsync_home().path();

    // When FINSYNC_IN_TEST_MODE is set and non-empty the backend is the in-memory test remote,
    // otherwise it is the HTTP backend from the config.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args).await?.print(),
        Command::List(list_args) => commands::list(Config::load(home).await?, mode, list_args)
            .await?
            .print(),
        Command::Create(create_args) => {
            commands::create(Config::load(home).await?, mode, create_args)
                .await?
                .print()
        }
        Command::Update(update_args) => {
            commands::update(Config::load(home).await?, mode, update_args)
                .await?
                .print()
        }
        Command::Delete(delete_args) => {
            commands::delete(Config::load(home).await?, mode, delete_args)
                .await?
                .print()
        }
        Command::Sync => commands::sync(Config::load(home).await?, mode).await?.print(),
        Command::Pending => commands::pending(Config::load(home).await?, mode)
            .await?
            .print(),
        Command::Export(export_args) => {
            commands::export(Config::load(home).await?, mode, export_args)
                .await?
                .print()
        }
        Command::Import(import_args) => {
            commands::import(Config::load(home).await?, mode, import_args)
                .await?
                .print()
        }
        Command::Migrate(migrate_args) => {
            commands::migrate(Config::load(home).await?, migrate_args)
                .await?
                .print()
        }
        Command::Summary(summary_args) => {
            commands::summary(Config::load(home).await?, mode, summary_args)
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

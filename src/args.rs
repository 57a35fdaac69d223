//! These structs provide the CLI interface for the finsync CLI.

use crate::analysis::{SortOption, DEFAULT_TOP};
use crate::model::{codec, Amount, Direction};
use crate::store::StorageMode;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// finsync: A command-line client for a personal finance backend that keeps working offline.
///
/// Transactions are read from and written to the backend configured with `finsync init`. When the
/// backend cannot be reached, reads are answered from a local copy and writes are queued in an
/// outbox. The outbox is replayed automatically before every read, or on demand with
/// `finsync sync`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and its configuration file.
    ///
    /// This is the first command you should run. Put the bearer token for the backend in
    /// `$FINSYNC_HOME/.secrets/token` afterwards if the backend requires one.
    Init(InitArgs),
    /// List the transactions of an account within a date range.
    List(ListArgs),
    /// Create a transaction.
    Create(CreateArgs),
    /// Update a transaction. Omitted fields keep their current values.
    Update(UpdateArgs),
    /// Delete a transaction.
    Delete(DeleteArgs),
    /// Replay the queued offline writes against the backend.
    Sync,
    /// Show the queued offline writes.
    Pending,
    /// Write the transactions in a date range to a CSV file.
    Export(ExportArgs),
    /// Load transactions from a CSV file into local storage.
    Import(ImportArgs),
    /// Copy local storage to another backend and switch the configuration to it.
    Migrate(MigrateArgs),
    /// Show totals and a per-category breakdown for a date range.
    Summary(SummaryArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where finsync data and configuration is held. Defaults to ~/finsync
    #[arg(long, env = "FINSYNC_HOME", default_value_t = default_finsync_home())]
    finsync_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, finsync_home: PathBuf) -> Self {
        Self {
            log_level,
            finsync_home: finsync_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn finsync_home(&self) -> &DisplayPath {
        &self.finsync_home
    }
}

/// Args for the `finsync init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the backend, e.g. https://finance.example.com/api/v1/
    #[arg(long)]
    base_url: String,

    /// The account that commands operate on unless told otherwise.
    #[arg(long)]
    account_id: i64,

    /// The currency used for records built while offline. Defaults to RUB.
    #[arg(long)]
    currency: Option<String>,

    /// Where the local copy and the outbox are kept.
    #[arg(long, default_value_t = StorageMode::default())]
    storage: StorageMode,
}

impl InitArgs {
    pub fn new(base_url: impl Into<String>, account_id: i64) -> Self {
        Self {
            base_url: base_url.into(),
            account_id,
            currency: None,
            storage: StorageMode::default(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.storage = storage;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn storage(&self) -> StorageMode {
        self.storage
    }
}

/// The account and date window a read operates on.
#[derive(Debug, Parser, Clone, Default)]
pub struct RangeArgs {
    /// The account to read. Defaults to the configured account.
    #[arg(long)]
    account: Option<i64>,

    /// The first day of the range (yyyy-MM-dd, inclusive). Defaults to the first day of the
    /// current month.
    #[arg(long, value_parser = parse_day)]
    from: Option<NaiveDate>,

    /// The last day of the range (yyyy-MM-dd, inclusive). Defaults to today.
    #[arg(long, value_parser = parse_day)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    pub fn new(account: Option<i64>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { account, from, to }
    }

    pub fn account(&self) -> Option<i64> {
        self.account
    }

    /// The UTC instants spanning the whole of the first and last days.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = Utc::now().date_naive();
        let from = self.from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let to = self.to.unwrap_or(today);
        (start_of_day(from), end_of_day(to))
    }
}

/// Args for the `finsync list` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ListArgs {
    #[clap(flatten)]
    range: RangeArgs,

    /// Only show income or outcome transactions.
    #[arg(long)]
    direction: Option<Direction>,

    /// The ordering of the list.
    #[arg(long, default_value_t = SortOption::default())]
    sort: SortOption,
}

impl ListArgs {
    pub fn new(range: RangeArgs, direction: Option<Direction>, sort: SortOption) -> Self {
        Self {
            range,
            direction,
            sort,
        }
    }

    pub fn range(&self) -> &RangeArgs {
        &self.range
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn sort(&self) -> SortOption {
        self.sort
    }
}

/// Args for the `finsync create` command.
#[derive(Debug, Parser, Clone)]
pub struct CreateArgs {
    /// A category id, or a part of a category name.
    #[arg(long)]
    category: String,

    /// The amount, e.g. 500.00. Must not be negative.
    #[arg(long)]
    amount: Amount,

    /// When the transaction happened, either yyyy-MM-dd or an ISO-8601 timestamp. Defaults to
    /// now.
    #[arg(long, value_parser = parse_when)]
    date: Option<DateTime<Utc>>,

    #[arg(long)]
    comment: Option<String>,

    /// The account to create the transaction in. Defaults to the configured account.
    #[arg(long)]
    account: Option<i64>,
}

impl CreateArgs {
    pub fn new(category: impl Into<String>, amount: Amount) -> Self {
        Self {
            category: category.into(),
            amount,
            date: None,
            comment: None,
            account: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn account(&self) -> Option<i64> {
        self.account
    }
}

/// Args for the `finsync update` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct UpdateArgs {
    /// The id of the transaction to update.
    id: i64,

    /// A category id, or a part of a category name.
    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    amount: Option<Amount>,

    /// Either yyyy-MM-dd or an ISO-8601 timestamp.
    #[arg(long, value_parser = parse_when)]
    date: Option<DateTime<Utc>>,

    #[arg(long)]
    comment: Option<String>,

    /// Move the transaction to another account.
    #[arg(long)]
    account: Option<i64>,
}

impl UpdateArgs {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn account(&self) -> Option<i64> {
        self.account
    }
}

/// Args for the `finsync delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction to delete.
    id: i64,
}

impl DeleteArgs {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

/// Args for the `finsync export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// The CSV file to write.
    #[arg(long)]
    out: PathBuf,

    #[clap(flatten)]
    range: RangeArgs,
}

impl ExportArgs {
    pub fn new(out: impl Into<PathBuf>, range: RangeArgs) -> Self {
        Self {
            out: out.into(),
            range,
        }
    }

    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn range(&self) -> &RangeArgs {
        &self.range
    }
}

/// Args for the `finsync import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// A CSV file in the layout written by `finsync export`.
    file: PathBuf,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Args for the `finsync migrate` command.
#[derive(Debug, Parser, Clone)]
pub struct MigrateArgs {
    /// The storage backend to move to.
    #[arg(long)]
    to: StorageMode,
}

impl MigrateArgs {
    pub fn new(to: StorageMode) -> Self {
        Self { to }
    }

    pub fn to(&self) -> StorageMode {
        self.to
    }
}

/// Args for the `finsync summary` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct SummaryArgs {
    #[clap(flatten)]
    range: RangeArgs,

    /// Summarize income instead of spending.
    #[arg(long, default_value_t = Direction::Outcome)]
    direction: Direction,

    /// How many categories to show before folding the rest into "Others".
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: usize,
}

impl SummaryArgs {
    pub fn new(range: RangeArgs, direction: Direction, top: usize) -> Self {
        Self {
            range,
            direction,
            top,
        }
    }

    pub fn range(&self) -> &RangeArgs {
        &self.range
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn top(&self) -> usize {
        self.top
    }
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    codec::parse_query_date(s).map_err(|e| format!("{e:#}"))
}

/// Accepts a plain day (midnight UTC) or a full timestamp.
fn parse_when(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(day) = codec::parse_query_date(s) {
        return Ok(start_of_day(day));
    }
    codec::parse_timestamp(s).map_err(|e| format!("{e:#}"))
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

fn default_finsync_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finsync"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --finsync-home or FINSYNC_HOME instead of relying on the \
                default finsync home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("finsync")
        }
    })
}

/// A `PathBuf` that can be used as a clap default value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::date;

    #[test]
    fn test_parse_list_args() {
        let args = Args::try_parse_from([
            "finsync",
            "--finsync-home",
            "/tmp/fs",
            "list",
            "--from",
            "2025-06-01",
            "--to",
            "2025-06-30",
            "--direction",
            "income",
            "--sort",
            "amount",
        ])
        .unwrap();
        assert_eq!(args.common().finsync_home().path(), Path::new("/tmp/fs"));
        let Command::List(list) = args.command() else {
            panic!("expected the list command");
        };
        assert_eq!(list.direction(), Some(Direction::Income));
        assert_eq!(list.sort(), SortOption::Amount);
        let (start, end) = list.range().bounds();
        assert_eq!(start, date("2025-06-01T00:00:00Z"));
        assert_eq!(end, date("2025-06-30T23:59:59.999Z"));
    }

    #[test]
    fn test_parse_create_args() {
        let args = Args::try_parse_from([
            "finsync",
            "create",
            "--category",
            "groc",
            "--amount",
            "500.00",
            "--date",
            "2025-06-02T08:30:00Z",
        ])
        .unwrap();
        let Command::Create(create) = args.command() else {
            panic!("expected the create command");
        };
        assert_eq!(create.category(), "groc");
        assert_eq!(create.amount().to_string(), "500.00");
        assert_eq!(create.date(), Some(date("2025-06-02T08:30:00Z")));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let result = Args::try_parse_from([
            "finsync",
            "create",
            "--category",
            "1",
            "--amount=-5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_day_is_rejected() {
        assert!(parse_day("06/01/2025").is_err());
        assert_eq!(
            parse_when("2025-06-01").unwrap(),
            date("2025-06-01T00:00:00Z")
        );
    }

    #[test]
    fn test_default_range_is_current_month() {
        let (start, end) = RangeArgs::default().bounds();
        assert_eq!(start.day(), 1);
        assert!(start <= end);
        assert_eq!(end.date_naive(), Utc::now().date_naive());
    }
}

//! The SQLite backend for the mirror and the outbox.

mod migrations;

use crate::error::Res;
use crate::model::codec::{format_timestamp, parse_decimal, parse_timestamp};
use crate::model::{Account, Amount, Category, Emoji, OutboxAction, OutboxEntry, Transaction};
use crate::store::{LocalStore, OutboxStore};
use crate::utils;
use anyhow::{bail, Context};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub(crate) const SQLITE_FILE: &str = "finsync.sqlite";

const SELECT_TRANSACTIONS: &str = "SELECT id, account_id, account_name, account_balance, \
    account_currency, category_id, category_name, category_emoji, category_is_income, amount, \
    transaction_date, comment, created_at, updated_at FROM transactions";

const UPSERT_TRANSACTION: &str = "INSERT OR REPLACE INTO transactions (id, account_id, \
    account_name, account_balance, account_currency, category_id, category_name, category_emoji, \
    category_is_income, amount, transaction_date, comment, created_at, updated_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens the database at `path`, creating and initializing it if it does not exist.
    pub(crate) async fn open(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if utils::exists(path).await? {
            Self::load(path).await
        } else {
            Self::init(path).await
        }
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Brings the schema up to date if it is older than this build
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !utils::exists(path).await? {
            bail!("No database file found at {}", path.display());
        }
        let db = Self::connect(path, false).await?;
        let current = migrations::version(&db.pool).await?;
        if current > migrations::CURRENT_VERSION {
            bail!(
                "The database at {} is at schema version {current}, which is newer than the \
                supported version {}",
                path.display(),
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&db.pool, current, migrations::CURRENT_VERSION).await?;
        Ok(db)
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path` and initializes the schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if utils::exists(path).await? {
            bail!("A database file already exists at {}", path.display());
        }
        debug!("Creating database at {}", path.display());
        let db = Self::connect(path, true).await?;
        migrations::run(&db.pool, 0, migrations::CURRENT_VERSION).await?;
        Ok(db)
    }

    async fn connect(path: &Path, create: bool) -> Res<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open SQLite database at {}", path.display()))?;
        migrations::bootstrap(&pool).await?;
        Ok(Self { pool })
    }
}

fn bind_transaction<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    t: &Transaction,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(t.id)
        .bind(t.account.id)
        .bind(t.account.name.clone())
        .bind(t.account.balance.to_string())
        .bind(t.account.currency.clone())
        .bind(t.category.id)
        .bind(t.category.name.clone())
        .bind(t.category.emoji.to_string())
        .bind(t.category.is_income)
        .bind(t.amount.to_string())
        .bind(format_timestamp(&t.transaction_date))
        .bind(t.comment.clone())
        .bind(format_timestamp(&t.created_at))
        .bind(format_timestamp(&t.updated_at))
}

fn transaction_from_row(row: &SqliteRow) -> Res<Transaction> {
    let id: i64 = row.try_get("id")?;
    let amount: String = row.try_get("amount")?;
    let balance: String = row.try_get("account_balance")?;
    let emoji: String = row.try_get("category_emoji")?;
    let transaction_date: String = row.try_get("transaction_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Transaction {
        id,
        account: Account::brief(
            row.try_get("account_id")?,
            row.try_get::<String, _>("account_name")?,
            parse_decimal(&balance)?,
            row.try_get::<String, _>("account_currency")?,
        ),
        category: Category {
            id: row.try_get("category_id")?,
            name: row.try_get("category_name")?,
            emoji: Emoji::parse(&emoji).unwrap_or(Emoji::PLACEHOLDER),
            is_income: row.try_get("category_is_income")?,
        },
        amount: Amount::from_str(&amount)
            .with_context(|| format!("Invalid amount stored for transaction {id}"))?,
        transaction_date: parse_timestamp(&transaction_date)?,
        comment: row.try_get("comment")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl LocalStore for Db {
    async fn get_all(&self) -> Res<Vec<Transaction>> {
        let rows = sqlx::query(&format!("{SELECT_TRANSACTIONS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .context("Unable to read transactions from the database")?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn get(&self, id: i64) -> Res<Option<Transaction>> {
        let row = sqlx::query(&format!("{SELECT_TRANSACTIONS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to read transaction {id} from the database"))?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn create(&self, transaction: &Transaction) -> Res<()> {
        bind_transaction(sqlx::query(UPSERT_TRANSACTION), transaction)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to save transaction {}", transaction.id))?;
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> Res<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM transactions WHERE id = ?")
            .bind(transaction.id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            bail!("Transaction {} is not in the local store", transaction.id);
        }
        bind_transaction(sqlx::query(UPSERT_TRANSACTION), transaction)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unable to update transaction {}", transaction.id))?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Res<()> {
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete transaction {id}"))?;
        Ok(())
    }

    async fn replace_all(&self, transactions: &[Transaction]) -> Res<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin replace transaction")?;
        sqlx::query("DELETE FROM transactions")
            .execute(&mut *tx)
            .await
            .context("Unable to clear the transactions table")?;
        for t in transactions {
            bind_transaction(sqlx::query(UPSERT_TRANSACTION), t)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to save transaction {}", t.id))?;
        }
        tx.commit()
            .await
            .context("Failed to commit replace transaction")
    }
}

#[async_trait::async_trait]
impl OutboxStore for Db {
    async fn get_all(&self) -> Res<Vec<OutboxEntry>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, action, payload FROM outbox ORDER BY seq")
                .fetch_all(&self.pool)
                .await
                .context("Unable to read the outbox")?;
        rows.into_iter()
            .map(|(id, action, payload)| {
                let action = OutboxAction::from_str(&action)
                    .with_context(|| format!("Invalid outbox action '{action}' for {id}"))?;
                let transaction: Transaction = serde_json::from_str(&payload)
                    .with_context(|| format!("Invalid outbox payload for {id}"))?;
                Ok(OutboxEntry {
                    id,
                    action,
                    transaction,
                })
            })
            .collect()
    }

    async fn save(&self, entry: &OutboxEntry) -> Res<()> {
        let payload = serde_json::to_string(&entry.transaction)
            .context("Unable to serialize outbox payload")?;
        sqlx::query(
            "INSERT INTO outbox (id, action, payload) VALUES (?, ?, ?) \
            ON CONFLICT(id) DO UPDATE SET action = excluded.action, payload = excluded.payload",
        )
        .bind(entry.id)
        .bind(entry.action.to_string())
        .bind(payload)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Unable to save outbox entry {}", entry.id))?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Res<()> {
        sqlx::query("DELETE FROM outbox WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete outbox entry {id}"))?;
        Ok(())
    }
}

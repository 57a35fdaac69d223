//! CSV export and import of transactions.
//!
//! The layout is one flat row per transaction with the account and category snapshots spread into
//! columns. Quoting follows RFC 4180, so comments may contain commas and newlines.

use crate::error::Res;
use crate::model::codec::{format_timestamp, parse_decimal, parse_timestamp};
use crate::model::{Account, Amount, Category, Emoji, Transaction};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// The header row, in column order.
pub const HEADERS: [&str; 14] = [
    "id",
    "accountId",
    "accountName",
    "accountBalance",
    "accountCurrency",
    "categoryId",
    "categoryName",
    "categoryEmoji",
    "isIncome",
    "amount",
    "transactionDate",
    "comment",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRecord {
    id: String,
    account_id: String,
    account_name: String,
    account_balance: String,
    account_currency: String,
    category_id: String,
    category_name: String,
    category_emoji: String,
    is_income: String,
    amount: String,
    transaction_date: String,
    comment: String,
    created_at: String,
    updated_at: String,
}

impl From<&Transaction> for CsvRecord {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id.to_string(),
            account_id: t.account.id.to_string(),
            account_name: t.account.name.clone(),
            account_balance: t.account.balance.to_string(),
            account_currency: t.account.currency.clone(),
            category_id: t.category.id.to_string(),
            category_name: t.category.name.clone(),
            category_emoji: t.category.emoji.to_string(),
            is_income: t.category.is_income.to_string(),
            amount: t.amount.to_string(),
            transaction_date: format_timestamp(&t.transaction_date),
            comment: t.comment.clone().unwrap_or_default(),
            created_at: format_timestamp(&t.created_at),
            updated_at: format_timestamp(&t.updated_at),
        }
    }
}

impl TryFrom<CsvRecord> for Transaction {
    type Error = anyhow::Error;

    fn try_from(r: CsvRecord) -> Res<Self> {
        let id = r.id.trim().parse().with_context(|| format!("invalid id '{}'", r.id))?;
        let account_id = r
            .account_id
            .trim()
            .parse()
            .with_context(|| format!("invalid account id '{}'", r.account_id))?;
        if r.account_name.is_empty() {
            bail!("empty account name");
        }
        let balance = parse_decimal(&r.account_balance).context("invalid account balance")?;
        if r.account_currency.is_empty() {
            bail!("empty currency");
        }
        let category_id = r
            .category_id
            .trim()
            .parse()
            .with_context(|| format!("invalid category id '{}'", r.category_id))?;
        if r.category_name.is_empty() {
            bail!("empty category name");
        }
        let emoji = Emoji::parse(&r.category_emoji).context("missing emoji")?;
        let is_income = r
            .is_income
            .trim()
            .parse::<bool>()
            .with_context(|| format!("invalid isIncome value '{}'", r.is_income))?;
        let amount = Amount::from_str(&r.amount)
            .with_context(|| format!("invalid amount '{}'", r.amount))?;

        Ok(Transaction {
            id,
            account: Account::brief(account_id, r.account_name, balance, r.account_currency),
            category: Category {
                id: category_id,
                name: r.category_name,
                emoji,
                is_income,
            },
            amount,
            transaction_date: parse_timestamp(&r.transaction_date)
                .context("invalid transaction date")?,
            comment: (!r.comment.is_empty()).then_some(r.comment),
            created_at: parse_timestamp(&r.created_at).context("invalid createdAt date")?,
            updated_at: parse_timestamp(&r.updated_at).context("invalid updatedAt date")?,
        })
    }
}

/// Writes `transactions` as CSV with a header row.
pub fn to_csv<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Res<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(HEADERS)
        .context("Unable to write CSV header")?;
    for t in transactions {
        writer
            .serialize(CsvRecord::from(t))
            .with_context(|| format!("Unable to write CSV row for transaction {}", t.id))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to flush CSV writer: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Parses CSV produced by `to_csv`. Rows that fail validation are skipped with a warning; a
/// missing or malformed header is an error.
pub fn from_csv(data: &str) -> Res<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers().context("Unable to read CSV header")?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    for expected in HEADERS {
        if !headers.iter().any(|h| h == expected) {
            bail!("CSV header is missing the '{expected}' column");
        }
    }

    let mut transactions = Vec::new();
    for (ix, row) in reader.deserialize::<CsvRecord>().enumerate() {
        // Header is line 1.
        let line = ix + 2;
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                warn!("Line {line}: unreadable row: {e}");
                continue;
            }
        };
        match Transaction::try_from(record) {
            Ok(t) => transactions.push(t),
            Err(e) => warn!("Line {line}: {e:#}"),
        }
    }
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_transaction;

    #[test]
    fn test_row_has_fourteen_columns() {
        let t = sample_transaction(42, "500.00");
        let csv = to_csv([&t]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), HEADERS.join(","));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row.len(), 14);
        assert_eq!(row[0], "42");
        assert_eq!(row[9], "500.00");
    }

    #[test]
    fn test_parse_restores_transaction() {
        let mut t = sample_transaction(42, "500.00");
        t.comment = Some("lunch, with friends".to_string());
        let parsed = from_csv(&to_csv([&t]).unwrap()).unwrap();
        assert_eq!(parsed, vec![t]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let csv = format!("{}\n\n", HEADERS.join(","));
        assert!(from_csv(&csv).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_rows_skipped() {
        let good = sample_transaction(1, "10");
        let mut csv = to_csv([&good]).unwrap();
        csv.push_str("x,1,Main,0,RUB,1,Food,🍏,false,1,2025-01-01T00:00:00Z,,2025-01-01T00:00:00Z,2025-01-01T00:00:00Z\n");
        csv.push_str("2,1,Main,0,RUB,1,Food,🍏,maybe,1,2025-01-01T00:00:00Z,,2025-01-01T00:00:00Z,2025-01-01T00:00:00Z\n");
        csv.push_str("3,1,Main\n");
        let parsed = from_csv(&csv).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, 1);
    }

    #[test]
    fn test_missing_column_is_error() {
        assert!(from_csv("id,amount\n1,2\n").is_err());
    }
}

use crate::model::codec;
use crate::model::{Account, Amount, Category, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A transaction with its account and category snapshots.
///
/// This is the shape returned by `GET transactions/account/{id}/period` and `PUT
/// transactions/{id}`, and it is also the persisted layout of the cache, the mirror and the
/// outbox payloads.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-assigned, or a negative placeholder for a create that has not reached the remote.
    pub id: i64,
    pub account: Account,
    pub category: Category,
    pub amount: Amount,
    #[serde(with = "codec::timestamp")]
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(with = "codec::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "codec::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// True for records that were synthesized locally and never confirmed by the remote.
    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }

    pub fn direction(&self) -> Direction {
        self.category.direction()
    }

    /// Whether this transaction belongs to `account_id` and falls within `[start, end]`.
    pub fn matches(&self, account_id: i64, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        self.account.id == account_id
            && *start <= self.transaction_date
            && self.transaction_date <= *end
    }

    /// The request that would recreate or update this transaction remotely.
    pub fn to_request(&self) -> TransactionRequest {
        TransactionRequest {
            account_id: self.account.id,
            category_id: self.category.id,
            amount: self.amount,
            transaction_date: self.transaction_date,
            comment: self.comment.clone(),
        }
    }
}

/// The body of `POST transactions` and `PUT transactions/{id}`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub account_id: i64,
    pub category_id: i64,
    pub amount: Amount,
    #[serde(with = "codec::timestamp")]
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The response of `POST transactions`, which only references the account and category by id.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTransaction {
    pub id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub amount: Amount,
    #[serde(with = "codec::timestamp")]
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(with = "codec::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "codec::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl CreatedTransaction {
    /// Combines the created record with its hydrated account and category.
    pub fn hydrate(self, account: Account, category: Category) -> Transaction {
        Transaction {
            id: self.id,
            account: account.into_brief(),
            category,
            amount: self.amount,
            transaction_date: self.transaction_date,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Removes later duplicates of an id, keeping the first occurrence and the original order.
pub fn dedup_by_id(transactions: impl IntoIterator<Item = Transaction>) -> Vec<Transaction> {
    let mut seen = HashSet::new();
    transactions
        .into_iter()
        .filter(|t| seen.insert(t.id))
        .collect()
}

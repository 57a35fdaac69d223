//! Building blocks for serving reads and writes while the remote is unreachable.

use crate::model::{
    codec, dedup_by_id, Account, Amount, Category, OutboxAction, OutboxEntry, Transaction,
    TransactionRequest,
};
use chrono::{DateTime, Utc};

/// Overlays pending outbox snapshots onto the mirror.
///
/// Create and update snapshots replace the mirror copy with the same id (or are appended), and ids
/// with a pending delete are removed.
pub(super) fn merge(mirror: Vec<Transaction>, outbox: &[OutboxEntry]) -> Vec<Transaction> {
    let mut merged = dedup_by_id(mirror);
    for entry in outbox {
        match entry.action {
            OutboxAction::Create | OutboxAction::Update => {
                match merged.iter_mut().find(|t| t.id == entry.id) {
                    Some(existing) => *existing = entry.transaction.clone(),
                    None => merged.push(entry.transaction.clone()),
                }
            }
            OutboxAction::Delete => merged.retain(|t| t.id != entry.id),
        }
    }
    merged
}

/// Finds account and category snapshots for a request among locally known transactions, falling
/// back to neutral placeholders that carry the requested ids.
pub(super) fn borrow_snapshots<'a>(
    known: impl IntoIterator<Item = &'a Transaction>,
    account_id: i64,
    category_id: i64,
    currency: &str,
) -> (Account, Category) {
    let mut account = None;
    let mut category = None;
    for t in known {
        if account.is_none() && t.account.id == account_id {
            account = Some(t.account.clone());
        }
        if category.is_none() && t.category.id == category_id {
            category = Some(t.category.clone());
        }
        if account.is_some() && category.is_some() {
            break;
        }
    }
    (
        account.unwrap_or_else(|| Account::placeholder(account_id, currency)),
        category.unwrap_or_else(|| Category::placeholder(category_id)),
    )
}

/// Turns a request into a full transaction with the given snapshots.
pub(super) fn materialize(
    id: i64,
    request: &TransactionRequest,
    account: Account,
    category: Category,
    created_at: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id,
        account,
        category,
        amount: request.amount,
        transaction_date: request.transaction_date,
        comment: request.comment.clone(),
        created_at,
        updated_at: codec::now(),
    }
}

/// A stand-in snapshot for deleting a transaction that is not known locally.
pub(super) fn unknown(id: i64, currency: &str) -> Transaction {
    let now = codec::now();
    Transaction {
        id,
        account: Account::placeholder(0, currency),
        category: Category::placeholder(0),
        amount: Amount::ZERO,
        transaction_date: now,
        comment: None,
        created_at: now,
        updated_at: now,
    }
}

//! Summaries over a list of transactions: direction filtering, totals, ordering and the
//! per-category breakdown shown next to the history.

use crate::model::{Amount, Direction, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The label of the share that collects every category past the top ones.
pub const OTHERS: &str = "Others";

/// The default number of categories shown before the rest is folded into `OTHERS`.
pub const DEFAULT_TOP: usize = 5;

/// How a transaction list is ordered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    /// Newest first.
    #[default]
    Date,
    /// Largest first.
    Amount,
}

serde_plain::derive_display_from_serialize!(SortOption);
serde_plain::derive_fromstr_from_deserialize!(SortOption);

/// One slice of the breakdown.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub amount: Amount,
    /// Percentage of the breakdown total, rounded to one decimal place.
    pub percent: Decimal,
}

pub fn filter_direction(transactions: &[Transaction], direction: Direction) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.direction() == direction)
        .cloned()
        .collect()
}

pub fn total(transactions: &[Transaction]) -> Amount {
    transactions.iter().map(|t| t.amount).sum()
}

/// Sorts in place. The sort is stable, so equal keys keep their relative order.
pub fn sort(transactions: &mut [Transaction], option: SortOption) {
    match option {
        SortOption::Date => {
            transactions.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date))
        }
        SortOption::Amount => transactions.sort_by(|a, b| b.amount.cmp(&a.amount)),
    }
}

/// Sums amounts per category name, largest first (ties by name).
///
/// When there are more than `top` categories, everything past the first `top` is folded into a
/// single `OTHERS` share at the end.
pub fn breakdown(transactions: &[Transaction], top: usize) -> Vec<Share> {
    let mut sums: HashMap<&str, Amount> = HashMap::new();
    for t in transactions {
        let sum = sums.entry(t.category.name.as_str()).or_default();
        *sum = *sum + t.amount;
    }
    let mut sorted: Vec<(&str, Amount)> = sums.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let grand_total: Amount = sorted.iter().map(|(_, amount)| *amount).sum();
    let share = |label: &str, amount: Amount| Share {
        label: label.to_string(),
        amount,
        percent: percent(amount, grand_total),
    };

    if sorted.len() <= top {
        return sorted
            .into_iter()
            .map(|(label, amount)| share(label, amount))
            .collect();
    }
    let others: Amount = sorted[top..].iter().map(|(_, amount)| *amount).sum();
    sorted[..top]
        .iter()
        .map(|(label, amount)| share(label, *amount))
        .chain(std::iter::once(share(OTHERS, others)))
        .collect()
}

fn percent(part: Amount, whole: Amount) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part.value() * Decimal::ONE_HUNDRED / whole.value()).round_dp(1)
}

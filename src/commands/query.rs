//! Read commands: `list` and `summary`.

use crate::analysis::{self, Share};
use crate::api::Mode;
use crate::args::{ListArgs, RangeArgs, SummaryArgs};
use crate::commands::{plural, Out};
use crate::model::{codec, Amount, Direction, Transaction};
use crate::{Config, Result, TransactionService};
use serde::Serialize;
use std::fmt::Write;

/// Lists the transactions of the requested account and window.
///
/// The list comes from the backend when it can be reached, otherwise from local storage with any
/// queued offline writes applied. Either way this does not fail once the service is built.
pub async fn list(config: Config, mode: Mode, args: &ListArgs) -> Result<Out<Vec<Transaction>>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let mut transactions = fetch(&service, &config, args.range()).await;
    if let Some(direction) = args.direction() {
        transactions = analysis::filter_direction(&transactions, direction);
    }
    analysis::sort(&mut transactions, args.sort());

    let mut message = format!("Found {}", plural(transactions.len(), "transaction"));
    for t in &transactions {
        let _ = write!(message, "\n{}", line(t));
    }
    Ok(Out::new(message, transactions))
}

/// Totals for one direction over a window.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub direction: Direction,
    pub count: usize,
    pub total: Amount,
    pub shares: Vec<Share>,
}

/// Sums the transactions of one direction and breaks the total down by category.
pub async fn summary(config: Config, mode: Mode, args: &SummaryArgs) -> Result<Out<Summary>> {
    let service = TransactionService::from_config(&config, mode).await?;
    let transactions = fetch(&service, &config, args.range()).await;
    let selected = analysis::filter_direction(&transactions, args.direction());
    let summary = Summary {
        direction: args.direction(),
        count: selected.len(),
        total: analysis::total(&selected),
        shares: analysis::breakdown(&selected, args.top()),
    };

    let mut message = format!(
        "Total {} {} over {}",
        summary.direction,
        summary.total,
        plural(summary.count, "transaction")
    );
    for share in &summary.shares {
        let _ = write!(
            message,
            "\n{:<20} {:>12} {:>6}%",
            share.label, share.amount, share.percent
        );
    }
    Ok(Out::new(message, summary))
}

async fn fetch(service: &TransactionService, config: &Config, range: &RangeArgs) -> Vec<Transaction> {
    let (start, end) = range.bounds();
    let account_id = range.account().unwrap_or(config.account_id());
    service.get_transactions(account_id, start, end).await
}

fn line(t: &Transaction) -> String {
    let sign = match t.direction() {
        Direction::Income => '+',
        Direction::Outcome => '-',
    };
    let mut s = format!(
        "{:>6}  {}  {} {:<16} {sign}{} {}",
        t.id,
        codec::format_query_date(&t.transaction_date),
        t.category.emoji,
        t.category.name,
        t.amount,
        t.account.currency,
    );
    if let Some(comment) = &t.comment {
        let _ = write!(s, "  {comment}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SortOption;
    use crate::test::{date, request, TestEnv};
    use chrono::NaiveDate;

    fn june() -> RangeArgs {
        RangeArgs::new(
            None,
            NaiveDate::from_ymd_opt(2025, 6, 1),
            NaiveDate::from_ymd_opt(2025, 6, 30),
        )
    }

    async fn seed(env: &TestEnv) {
        let service = env.service().await;
        for (category, amount, at) in [
            (1, "500.00", "2025-06-02T09:00:00Z"),
            (3, "200.00", "2025-06-03T19:00:00Z"),
            (2, "1500.00", "2025-06-05T12:00:00Z"),
            (1, "50.00", "2025-07-01T12:00:00Z"),
        ] {
            service
                .create_transaction(request(category, amount, at))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let env = TestEnv::new().await;
        seed(&env).await;

        let args = ListArgs::new(june(), Some(Direction::Outcome), SortOption::Amount);
        let out = list(env.config(), Mode::Test, &args).await.unwrap();
        let listed = out.structure().unwrap();
        let amounts: Vec<String> = listed.iter().map(|t| t.amount.to_string()).collect();
        assert_eq!(amounts, vec!["500.00", "200.00"]);
        assert!(out.message().starts_with("Found 2 transactions"));

        let args = ListArgs::new(june(), None, SortOption::Date);
        let out = list(env.config(), Mode::Test, &args).await.unwrap();
        let listed = out.structure().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].transaction_date, date("2025-06-05T12:00:00Z"));
    }

    #[tokio::test]
    async fn test_list_offline_uses_local_copy() {
        let env = TestEnv::new().await;
        seed(&env).await;
        env.remote().set_online(false);

        let args = ListArgs::new(june(), None, SortOption::Date);
        let out = list(env.config(), Mode::Test, &args).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_summary() {
        let env = TestEnv::new().await;
        seed(&env).await;

        let args = SummaryArgs::new(june(), Direction::Outcome, 1);
        let out = summary(env.config(), Mode::Test, &args).await.unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total.to_string(), "700.00");
        let labels: Vec<&str> = summary.shares.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Groceries", analysis::OTHERS]);
    }
}

//! Implements the `Remote` trait with in-memory data.
//!
//! This is compiled in the production binary too, so that the whole app can be driven end to end
//! without a backend. State lives in a process-wide registry keyed by name, so every `TestRemote`
//! created with the same name sees the same data.

use crate::api::Remote;
use crate::error::{Error, ErrorType, Result};
use crate::model::{
    codec, Account, Category, CreatedTransaction, Transaction, TransactionRequest,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

static REGISTRY: LazyLock<Mutex<HashMap<String, TestRemoteState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// A write the remote received while online.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RemoteCall {
    Create,
    Update(i64),
    Delete(i64),
}

/// The data held by a `TestRemote`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestRemoteState {
    pub online: bool,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    /// The writes received so far, in order.
    pub calls: Vec<RemoteCall>,
    next_id: i64,
}

impl Default for TestRemoteState {
    /// One account and a few categories, online, with no transactions.
    fn default() -> Self {
        let now = codec::now();
        Self {
            online: true,
            accounts: vec![Account {
                id: 1,
                user_id: Some(1),
                name: "Main".to_string(),
                balance: Decimal::new(100_000, 2),
                currency: "RUB".to_string(),
                created_at: Some(now),
                updated_at: Some(now),
            }],
            categories: vec![
                Category::new(1, "Groceries", '🍏', false),
                Category::new(2, "Salary", '💰', true),
                Category::new(3, "Dinner", '🍽', false),
                Category::new(4, "Transport", '🚌', false),
                Category::new(5, "Freelance", '💻', true),
            ],
            transactions: Vec::new(),
            calls: Vec::new(),
            next_id: 1,
        }
    }
}

/// An in-memory backend that can be switched offline to simulate outages.
#[derive(Debug, Clone)]
pub struct TestRemote {
    name: String,
}

impl TestRemote {
    /// Attaches to the state registered under `name`, seeding it with the default data if it does
    /// not exist yet.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        registry().entry(name.clone()).or_default();
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TestRemoteState {
        self.with_state(|state| state.clone())
    }

    pub fn set_state(&self, state: TestRemoteState) {
        registry().insert(self.name.clone(), state);
    }

    /// When offline every call fails with a network error.
    pub fn set_online(&self, online: bool) {
        self.with_state(|state| state.online = online);
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TestRemoteState) -> R) -> R {
        let mut registry = registry();
        f(registry.entry(self.name.clone()).or_default())
    }

    /// Runs `f` against the state if the remote is online.
    fn call<R>(&self, f: impl FnOnce(&mut TestRemoteState) -> Result<R>) -> Result<R> {
        self.with_state(|state| {
            if !state.online {
                return Err(Error::msg(ErrorType::Network, "The remote is offline"));
            }
            f(state)
        })
    }
}

fn registry() -> MutexGuard<'static, HashMap<String, TestRemoteState>> {
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TestRemoteState {
    fn find_account(&self, id: i64) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::msg(ErrorType::NotFound, format!("Account {id} not found")))
    }

    fn find_category(&self, id: i64) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::msg(ErrorType::NotFound, format!("Category {id} not found")))
    }

    fn materialize(
        &self,
        id: i64,
        request: &TransactionRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let account = self.find_account(request.account_id)?.clone().into_brief();
        let category = self.find_category(request.category_id)?.clone();
        Ok(Transaction {
            id,
            account,
            category,
            amount: request.amount,
            transaction_date: request.transaction_date,
            comment: request.comment.clone(),
            created_at,
            updated_at: codec::now(),
        })
    }
}

#[async_trait::async_trait]
impl Remote for TestRemote {
    async fn list_transactions(
        &self,
        account_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        self.call(|state| {
            // The query window has day granularity, like the real endpoint.
            let start = start.date_naive();
            let end = end.date_naive();
            Ok(state
                .transactions
                .iter()
                .filter(|t| t.account.id == account_id)
                .filter(|t| {
                    let day = t.transaction_date.date_naive();
                    start <= day && day <= end
                })
                .cloned()
                .collect())
        })
    }

    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<CreatedTransaction> {
        self.call(|state| {
            let id = state.next_id;
            let t = state.materialize(id, request, codec::now())?;
            state.next_id += 1;
            state.calls.push(RemoteCall::Create);
            state.transactions.push(t.clone());
            Ok(CreatedTransaction {
                id,
                account_id: t.account.id,
                category_id: t.category.id,
                amount: t.amount,
                transaction_date: t.transaction_date,
                comment: t.comment,
                created_at: t.created_at,
                updated_at: t.updated_at,
            })
        })
    }

    async fn update_transaction(
        &self,
        id: i64,
        request: &TransactionRequest,
    ) -> Result<Transaction> {
        self.call(|state| {
            state.calls.push(RemoteCall::Update(id));
            let ix = state
                .transactions
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| {
                    Error::msg(ErrorType::NotFound, format!("Transaction {id} not found"))
                })?;
            let updated = state.materialize(id, request, state.transactions[ix].created_at)?;
            state.transactions[ix] = updated.clone();
            Ok(updated)
        })
    }

    async fn delete_transaction(&self, id: i64) -> Result<()> {
        self.call(|state| {
            state.calls.push(RemoteCall::Delete(id));
            let before = state.transactions.len();
            state.transactions.retain(|t| t.id != id);
            if state.transactions.len() == before {
                return Err(Error::msg(
                    ErrorType::NotFound,
                    format!("Transaction {id} not found"),
                ));
            }
            Ok(())
        })
    }

    async fn account(&self, id: i64) -> Result<Account> {
        self.call(|state| state.find_account(id).cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        self.call(|state| Ok(state.categories.clone()))
    }
}

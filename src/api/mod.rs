//! The remote data source: CRUD access to the finance backend.

mod http;
mod test_remote;

use crate::error::{IntoResult, Result};
use crate::model::{Account, Category, CreatedTransaction, Transaction, TransactionRequest};
use crate::{Config, ErrorType};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use http::HttpRemote;
pub use test_remote::{RemoteCall, TestRemote, TestRemoteState};

/// The environment variable that switches the host to the in-memory remote.
pub const TEST_MODE_ENV: &str = "FINSYNC_IN_TEST_MODE";

/// Selects which `Remote` implementation the host uses.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `FINSYNC_IN_TEST_MODE` is set to a non-empty value, otherwise
    /// `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// The backend operations the sync service depends on.
///
/// Every failure is classified: `Network` for an unreachable remote or a non-2xx answer,
/// `NotFound` for a 404, and `Decoding` for a payload that does not match the expected shape.
#[async_trait::async_trait]
pub trait Remote: Send + Sync {
    /// `GET transactions/account/{id}/period?startDate&endDate`
    async fn list_transactions(
        &self,
        account_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    /// `POST transactions`
    async fn create_transaction(&self, request: &TransactionRequest)
        -> Result<CreatedTransaction>;

    /// `PUT transactions/{id}`
    async fn update_transaction(&self, id: i64, request: &TransactionRequest)
        -> Result<Transaction>;

    /// `DELETE transactions/{id}`
    async fn delete_transaction(&self, id: i64) -> Result<()>;

    /// `GET accounts/{id}`
    async fn account(&self, id: i64) -> Result<Account>;

    /// `GET categories`
    async fn categories(&self) -> Result<Vec<Category>>;
}

/// Builds the remote for `mode`.
///
/// In `Mode::Test` the remote is the in-memory backend registered under the configured base URL,
/// so separate processes or service instances pointing at the same URL share state within one
/// process.
pub async fn remote(config: &Config, mode: Mode) -> Result<Arc<dyn Remote>> {
    match mode {
        Mode::Http => {
            let token = config.token().await.pub_result(ErrorType::Config)?;
            let remote = HttpRemote::new(config.base_url(), token, config.request_timeout())?;
            Ok(Arc::new(remote))
        }
        Mode::Test => Ok(Arc::new(TestRemote::new(config.base_url()))),
    }
}

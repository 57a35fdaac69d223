//! Types that represent the core data model, such as `Transaction` and `OutboxEntry`, and the
//! codecs used to move them across the wire and into local storage.
mod account;
mod amount;
mod category;
pub mod codec;
pub mod csv;
mod outbox;
mod transaction;

pub use account::Account;
pub use amount::{Amount, AmountError};
pub use category::{search as search_categories, Category, Direction, Emoji};
pub use outbox::{OutboxAction, OutboxEntry};
pub use transaction::{dedup_by_id, CreatedTransaction, Transaction, TransactionRequest};

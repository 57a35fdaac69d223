//! finsync: an offline-first client for a personal finance backend.
//!
//! `TransactionService` fronts a `Remote` backend with a local cache, a persistent mirror and an
//! outbox of writes that could not be delivered. Reads replay the outbox and then refresh from the
//! remote, falling back to local state when the remote is unreachable.

pub mod analysis;
pub mod api;
pub mod args;
mod backup;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod service;
pub mod store;
mod utils;


pub use api::Mode;
pub use config::{Config, InitSettings};
pub use error::{Error, ErrorType, Result};
pub use service::{DrainReport, TransactionService};

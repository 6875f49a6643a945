//! Ledger core: cash account, holdings aggregation, the append-only event
//! log, and the service that applies buys and sells across all three in
//! one transaction.

pub mod account;
pub mod holdings;
pub mod log;
pub mod service;

pub use service::{Execution, LedgerService, Portfolio};

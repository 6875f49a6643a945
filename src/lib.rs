//! Multi-user inventory ledger: cash balances, weighted-average holdings
//! and an append-only trade log kept consistent by one store transaction
//! per buy or sell, served over a small JSON/CSV HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod persistence;
pub mod telemetry;
pub mod types;

//! Runtime configuration from the environment (and `.env`).

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;

use crate::ledger::service::DEFAULT_MAX_RETRIES;
use crate::types::order::PRICE_SCALE;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STARTING_CASH: &str = "10000.00";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Integer digits left by the `NUMERIC(28, 8)` cash column.
const CASH_INTEGER_DIGITS: u32 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    pub starting_cash: Decimal,
    pub max_tx_retries: u32,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let listen_addr = parse_or(
            var("LEDGER_LISTEN_ADDR"),
            DEFAULT_LISTEN_ADDR,
            "LEDGER_LISTEN_ADDR",
        )?;

        let Some(jwt_secret) = var("JWT_SECRET") else {
            bail!("JWT_SECRET must be set");
        };

        let starting_cash: Decimal = parse_or(
            var("LEDGER_STARTING_CASH"),
            DEFAULT_STARTING_CASH,
            "LEDGER_STARTING_CASH",
        )?;
        if starting_cash < Decimal::ZERO {
            bail!("LEDGER_STARTING_CASH must not be negative, got {starting_cash}");
        }
        if starting_cash.normalize().scale() > PRICE_SCALE {
            bail!("LEDGER_STARTING_CASH has more than {PRICE_SCALE} decimal places");
        }
        if starting_cash >= Decimal::from_i128_with_scale(10_i128.pow(CASH_INTEGER_DIGITS), 0) {
            bail!("LEDGER_STARTING_CASH must be below 1e{CASH_INTEGER_DIGITS}, got {starting_cash}");
        }

        let max_tx_retries = match var("LEDGER_TX_RETRIES") {
            Some(raw) => raw.parse().context("Invalid LEDGER_TX_RETRIES")?,
            None => DEFAULT_MAX_RETRIES,
        };
        let db_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().context("Invalid DATABASE_MAX_CONNECTIONS")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            listen_addr,
            database_url: var("DATABASE_URL"),
            jwt_secret: jwt_secret.into_bytes(),
            starting_cash,
            max_tx_retries,
            db_max_connections,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.as_deref()
        .unwrap_or(default)
        .parse()
        .with_context(|| format!("Invalid {key}"))
}

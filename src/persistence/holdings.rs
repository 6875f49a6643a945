//! Holding persistence: per-(user, symbol) rows with weighted-average price.

use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::types::holding::Holding;

#[derive(Debug, sqlx::FromRow)]
pub struct HoldingRow {
    pub user_id: Uuid,
    pub symbol: String,
    pub display_name: String,
    pub shares: i64,
    pub average_price: Decimal,
}

impl TryFrom<HoldingRow> for Holding {
    type Error = LedgerError;

    fn try_from(row: HoldingRow) -> LedgerResult<Self> {
        let shares = u64::try_from(row.shares).map_err(|_| {
            LedgerError::StorageFailure(format!(
                "holding {} has negative share count {}",
                row.symbol, row.shares
            ))
        })?;
        Ok(Holding {
            user_id: row.user_id,
            symbol: row.symbol,
            display_name: row.display_name,
            shares,
            average_price: row.average_price,
        })
    }
}

/// Upsert a holding (insert or update on conflict).
pub async fn upsert_holding<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    symbol: &str,
    display_name: &str,
    shares: i64,
    average_price: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO holdings (user_id, symbol, display_name, shares, average_price) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, symbol) DO UPDATE SET shares = $4, average_price = $5",
    )
    .bind(user_id)
    .bind(symbol)
    .bind(display_name)
    .bind(shares)
    .bind(average_price)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_holding<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    symbol: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM holdings WHERE user_id = $1 AND symbol = $2")
        .bind(user_id)
        .bind(symbol)
        .execute(executor)
        .await?;
    Ok(())
}

/// Fetch one holding, locking its row for the rest of the transaction.
pub async fn get_holding_for_update<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    symbol: &str,
) -> Result<Option<HoldingRow>, sqlx::Error> {
    sqlx::query_as::<_, HoldingRow>(
        "SELECT user_id, symbol, display_name, shares, average_price FROM holdings \
         WHERE user_id = $1 AND symbol = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(symbol)
    .fetch_optional(executor)
    .await
}

/// List holdings for a user (for GET /portfolio).
pub async fn list_holdings_for_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Vec<HoldingRow>, sqlx::Error> {
    sqlx::query_as::<_, HoldingRow>(
        "SELECT user_id, symbol, display_name, shares, average_price FROM holdings \
         WHERE user_id = $1 ORDER BY symbol",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

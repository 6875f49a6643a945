//! Ledger event persistence: append on trade, page through for history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::types::event::{LedgerEvent, NewLedgerEvent};

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub user_id: Uuid,
    pub symbol: String,
    pub display_name: String,
    pub share_delta: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for LedgerEvent {
    fn from(row: EventRow) -> Self {
        LedgerEvent {
            id: row.id,
            user_id: row.user_id,
            symbol: row.symbol,
            display_name: row.display_name,
            share_delta: row.share_delta,
            price: row.price,
            timestamp: row.created_at,
        }
    }
}

/// Append one event and return it with its assigned id.
pub async fn insert_event<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    event: &NewLedgerEvent,
) -> Result<LedgerEvent, sqlx::Error> {
    let row = sqlx::query_as::<_, EventRow>(
        "INSERT INTO ledger_events (user_id, symbol, display_name, share_delta, price, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, user_id, symbol, display_name, share_delta, price, created_at",
    )
    .bind(user_id)
    .bind(&event.symbol)
    .bind(&event.display_name)
    .bind(event.share_delta)
    .bind(event.price)
    .bind(event.timestamp)
    .fetch_one(executor)
    .await?;
    Ok(row.into())
}

/// Keyset page of a user's events in insertion order.
pub async fn list_events_page<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    after: Option<i64>,
    limit: usize,
) -> Result<Vec<LedgerEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        "SELECT id, user_id, symbol, display_name, share_delta, price, created_at \
         FROM ledger_events WHERE user_id = $1 AND id > $2 ORDER BY id LIMIT $3",
    )
    .bind(user_id)
    .bind(after.unwrap_or(0))
    .bind(limit as i64)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(LedgerEvent::from).collect())
}

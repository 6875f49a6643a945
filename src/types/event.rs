use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::order::{OrderSide, Price};

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: i64,
    pub user_id: Uuid,
    pub symbol: String,
    pub display_name: String,
    /// Positive for buys, negative for sells.
    pub share_delta: i64,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn side(&self) -> OrderSide {
        if self.share_delta < 0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }
}

/// Event fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEvent {
    pub symbol: String,
    pub display_name: String,
    pub share_delta: i64,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

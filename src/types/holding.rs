use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::order::{Price, Qty};

/// Current position per (user, symbol). Shares are always positive; a
/// fully sold position is deleted rather than kept at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: Uuid,
    pub symbol: String,
    pub display_name: String,
    pub shares: Qty,
    pub average_price: Price,
}

impl Holding {
    /// Shares valued at their weighted-average cost.
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.shares) * self.average_price
    }
}

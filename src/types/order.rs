use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

pub type Price = Decimal;
pub type Qty = u64;

/// Fractional digits carried by prices and cash amounts.
pub const PRICE_SCALE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Sign applied to the share count when the trade is logged.
    pub fn signed(self, qty: Qty) -> LedgerResult<i64> {
        let qty = to_db_qty(qty)?;
        Ok(match self {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        })
    }
}

/// Trim and lower-case a symbol so "ABC" and " abc" share one holding.
pub fn normalize_symbol(symbol: &str) -> LedgerResult<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(LedgerError::invalid("symbol is required"));
    }
    Ok(symbol.to_lowercase())
}

/// Share counts are stored as BIGINT.
pub fn to_db_qty(qty: Qty) -> LedgerResult<i64> {
    i64::try_from(qty).map_err(|_| LedgerError::invalid(format!("share count {qty} is too large")))
}

pub fn validate_qty(qty: Qty) -> LedgerResult<Qty> {
    if qty == 0 {
        return Err(LedgerError::invalid("share count must be positive"));
    }
    to_db_qty(qty)?;
    Ok(qty)
}

pub fn validate_price(price: Price) -> LedgerResult<Price> {
    if price <= Decimal::ZERO {
        return Err(LedgerError::invalid("price must be positive"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(LedgerError::invalid(format!(
            "price {price} has more than {PRICE_SCALE} decimal places"
        )));
    }
    Ok(price.normalize())
}

/// `qty * price`, failing instead of overflowing.
pub fn notional(qty: Qty, price: Price) -> LedgerResult<Decimal> {
    Decimal::from(qty)
        .checked_mul(price)
        .ok_or_else(|| LedgerError::invalid(format!("{qty} x {price} is out of range")))
}

/// A buy request as submitted by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub symbol: String,
    pub display_name: String,
    pub shares: Qty,
    pub price: Price,
}

impl BuyOrder {
    /// Normalizes the symbol and rejects anything out of range.
    pub fn validate(&self) -> LedgerResult<BuyOrder> {
        let display_name = self.display_name.trim();
        if display_name.is_empty() {
            return Err(LedgerError::invalid("display name is required"));
        }
        Ok(BuyOrder {
            symbol: normalize_symbol(&self.symbol)?,
            display_name: display_name.to_string(),
            shares: validate_qty(self.shares)?,
            price: validate_price(self.price)?,
        })
    }

    pub fn total_cost(&self) -> LedgerResult<Decimal> {
        notional(self.shares, self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellOrder {
    pub symbol: String,
    pub shares: Qty,
}

impl SellOrder {
    pub fn validate(&self) -> LedgerResult<SellOrder> {
        Ok(SellOrder {
            symbol: normalize_symbol(&self.symbol)?,
            shares: validate_qty(self.shares)?,
        })
    }
}

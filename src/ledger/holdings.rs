//! Holdings aggregation: apply_buy, apply_sell, weighted average.

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::persistence::LedgerTx;
use crate::types::holding::Holding;
use crate::types::order::{
    PRICE_SCALE, Price, Qty, normalize_symbol, notional, validate_price, validate_qty,
};

/// Result of taking shares out of a holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFill {
    /// Price per share the proceeds are computed from (the average cost).
    pub price: Price,
    pub display_name: String,
    /// What is left after the sale; `None` once the position is closed.
    pub remaining: Option<Holding>,
}

/// Quantity-weighted mean of the existing position and the new lot,
/// rounded to [`PRICE_SCALE`] places.
pub fn weighted_average(
    held: Qty,
    held_price: Price,
    added: Qty,
    added_price: Price,
) -> LedgerResult<Price> {
    let total_qty = held
        .checked_add(added)
        .ok_or_else(|| LedgerError::invalid("share count would overflow"))?;
    let total_cost = notional(held, held_price)?
        .checked_add(notional(added, added_price)?)
        .ok_or_else(|| LedgerError::invalid("position value would overflow"))?;
    let average = total_cost
        .checked_div(Decimal::from(total_qty))
        .ok_or_else(|| LedgerError::invalid("average price is undefined"))?;
    Ok(average.round_dp(PRICE_SCALE).normalize())
}

/// Add a lot to the user's holding, creating it on first buy. An existing
/// holding is reweighted and keeps its display name.
pub async fn apply_buy<T: LedgerTx>(
    tx: &mut T,
    symbol: &str,
    display_name: &str,
    shares: Qty,
    price: Price,
) -> LedgerResult<Holding> {
    let symbol = normalize_symbol(symbol)?;
    let shares = validate_qty(shares)?;
    let price = validate_price(price)?;
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(LedgerError::invalid("display name is required"));
    }

    let holding = match tx.holding(&symbol).await? {
        Some(existing) => {
            let average_price =
                weighted_average(existing.shares, existing.average_price, shares, price)?;
            Holding {
                shares: validate_qty(existing.shares + shares)?,
                average_price,
                ..existing
            }
        }
        None => Holding {
            user_id: tx.user_id(),
            symbol,
            display_name: display_name.to_string(),
            shares,
            average_price: price,
        },
    };
    tx.put_holding(&holding).await?;
    Ok(holding)
}

/// Take shares out of a holding. Sells never change the average price of
/// what remains; a holding sold down to zero is removed.
pub async fn apply_sell<T: LedgerTx>(
    tx: &mut T,
    symbol: &str,
    shares: Qty,
) -> LedgerResult<SaleFill> {
    let symbol = normalize_symbol(symbol)?;
    let shares = validate_qty(shares)?;

    let existing = tx
        .holding(&symbol)
        .await?
        .ok_or_else(|| LedgerError::NoSuchHolding {
            symbol: symbol.clone(),
        })?;
    if shares > existing.shares {
        return Err(LedgerError::InsufficientShares {
            symbol,
            requested: shares,
            held: existing.shares,
        });
    }

    let price = existing.average_price;
    let display_name = existing.display_name.clone();
    let left = existing.shares - shares;
    let remaining = if left == 0 {
        tx.remove_holding(&symbol).await?;
        None
    } else {
        let reduced = Holding {
            shares: left,
            ..existing
        };
        tx.put_holding(&reduced).await?;
        Some(reduced)
    };
    Ok(SaleFill {
        price,
        display_name,
        remaining,
    })
}

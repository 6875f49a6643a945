//! Cash balance: debit and credit under the non-negative balance rule.

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::persistence::LedgerTx;

/// Take `amount` out of the user's cash. Returns the new balance.
///
/// The balance is checked before anything is written, so a rejected debit
/// leaves the transaction untouched.
pub async fn debit<T: LedgerTx>(tx: &mut T, amount: Decimal) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "debit amount must be positive, got {amount}"
        )));
    }
    let available = tx.cash().await?;
    if amount > available {
        return Err(LedgerError::InsufficientFunds {
            need: amount,
            available,
        });
    }
    let balance = available - amount;
    tx.set_cash(balance).await?;
    Ok(balance)
}

/// Add `amount` to the user's cash. Returns the new balance.
pub async fn credit<T: LedgerTx>(tx: &mut T, amount: Decimal) -> LedgerResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "credit amount must not be negative, got {amount}"
        )));
    }
    let balance = tx
        .cash()
        .await?
        .checked_add(amount)
        .ok_or_else(|| LedgerError::invalid("cash balance would overflow"))?;
    tx.set_cash(balance).await?;
    Ok(balance)
}

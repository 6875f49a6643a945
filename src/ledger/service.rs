//! Buy/sell orchestration: one store transaction per trade, spanning cash,
//! holdings and the event log, retried on transient conflicts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{Stream, TryStreamExt};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{account, holdings, log};
use crate::persistence::{LedgerStore, LedgerTx};
use crate::types::event::{LedgerEvent, NewLedgerEvent};
use crate::types::holding::Holding;
use crate::types::order::{BuyOrder, OrderSide, SellOrder, notional};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base pause before the first retry; doubled on each further attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Outcome of a committed buy or sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub event: LedgerEvent,
    pub cash_after: Decimal,
    /// The position after the trade; `None` when a sell closed it.
    pub holding: Option<Holding>,
}

/// Cash plus holdings valued at cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub holdings: Vec<Holding>,
    pub holdings_value: Decimal,
    pub total: Decimal,
}

pub struct LedgerService<S> {
    store: Arc<S>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<S> Clone for LedgerService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
        }
    }
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Debit cash, add to the holding and log a positive event, atomically.
    #[instrument(skip(self, order), fields(symbol = %order.symbol, shares = order.shares))]
    pub async fn buy(&self, user_id: Uuid, order: &BuyOrder) -> LedgerResult<Execution> {
        let order = order.validate()?;
        let mut attempt = 0;
        loop {
            match self.try_buy(user_id, &order).await {
                Err(err) if self.should_retry(&err, attempt) => {
                    tokio::time::sleep(self.retry_delay(attempt)).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Reduce the holding, credit proceeds at average cost and log a
    /// negative event, atomically.
    #[instrument(skip(self, order), fields(symbol = %order.symbol, shares = order.shares))]
    pub async fn sell(&self, user_id: Uuid, order: &SellOrder) -> LedgerResult<Execution> {
        let order = order.validate()?;
        let mut attempt = 0;
        loop {
            match self.try_sell(user_id, &order).await {
                Err(err) if self.should_retry(&err, attempt) => {
                    tokio::time::sleep(self.retry_delay(attempt)).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn should_retry(&self, err: &LedgerError, attempt: u32) -> bool {
        if !err.is_retryable() || attempt >= self.max_retries {
            return false;
        }
        warn!(attempt = attempt + 1, max = self.max_retries, error = %err, "retrying trade");
        true
    }

    /// Exponential backoff plus up to one base interval of random jitter.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_backoff.saturating_mul(1 << attempt.min(16));
        let jitter_ms = self.retry_backoff.as_millis() as u64;
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    async fn try_buy(&self, user_id: Uuid, order: &BuyOrder) -> LedgerResult<Execution> {
        let cost = order.total_cost()?;
        let mut tx = self.store.begin(user_id).await?;

        let cash_after = account::debit(&mut tx, cost).await?;
        let holding = holdings::apply_buy(
            &mut tx,
            &order.symbol,
            &order.display_name,
            order.shares,
            order.price,
        )
        .await?;
        let event = log::append(
            &mut tx,
            NewLedgerEvent {
                symbol: holding.symbol.clone(),
                display_name: holding.display_name.clone(),
                share_delta: OrderSide::Buy.signed(order.shares)?,
                price: order.price,
                timestamp: Utc::now(),
            },
        )
        .await?;
        tx.commit().await?;

        info!(%user_id, event_id = event.id, %cost, %cash_after, "buy committed");
        Ok(Execution {
            event,
            cash_after,
            holding: Some(holding),
        })
    }

    async fn try_sell(&self, user_id: Uuid, order: &SellOrder) -> LedgerResult<Execution> {
        let mut tx = self.store.begin(user_id).await?;

        let fill = holdings::apply_sell(&mut tx, &order.symbol, order.shares).await?;
        let proceeds = notional(order.shares, fill.price)?;
        let cash_after = account::credit(&mut tx, proceeds).await?;
        let event = log::append(
            &mut tx,
            NewLedgerEvent {
                symbol: order.symbol.clone(),
                display_name: fill.display_name,
                share_delta: OrderSide::Sell.signed(order.shares)?,
                price: fill.price,
                timestamp: Utc::now(),
            },
        )
        .await?;
        tx.commit().await?;

        info!(%user_id, event_id = event.id, %proceeds, %cash_after, "sell committed");
        Ok(Execution {
            event,
            cash_after,
            holding: fill.remaining,
        })
    }

    pub async fn cash_balance(&self, user_id: Uuid) -> LedgerResult<Decimal> {
        self.store.cash_balance(user_id).await
    }

    pub async fn current_holdings(&self, user_id: Uuid) -> LedgerResult<Vec<Holding>> {
        self.store.holdings(user_id).await
    }

    /// Lazy, restartable stream of the user's events in insertion order.
    pub fn history(
        &self,
        user_id: Uuid,
    ) -> impl Stream<Item = LedgerResult<LedgerEvent>> + Send + use<S> {
        log::history(self.store.clone(), user_id)
    }

    pub async fn history_list(&self, user_id: Uuid) -> LedgerResult<Vec<LedgerEvent>> {
        self.history(user_id).try_collect().await
    }

    pub async fn portfolio(&self, user_id: Uuid) -> LedgerResult<Portfolio> {
        let cash = self.cash_balance(user_id).await?;
        let holdings = self.current_holdings(user_id).await?;
        let holdings_value = holdings.iter().map(Holding::cost_basis).sum::<Decimal>();
        Ok(Portfolio {
            cash,
            holdings,
            holdings_value,
            total: cash + holdings_value,
        })
    }
}

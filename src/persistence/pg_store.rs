//! PostgreSQL-backed [`LedgerStore`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::persistence::{LedgerStore, LedgerTx, events, holdings, users};
use crate::types::event::{LedgerEvent, NewLedgerEvent};
use crate::types::holding::Holding;
use crate::types::order::to_db_qty;
use crate::types::user::{NewUser, User, UserCredential};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self, user_id: Uuid) -> LedgerResult<PgTx> {
        let mut tx = self.pool.begin().await?;
        users::lock_user_cash(&mut *tx, user_id)
            .await?
            .ok_or(LedgerError::UnknownUser(user_id))?;
        Ok(PgTx { user_id, tx })
    }

    async fn create_user(&self, new_user: NewUser) -> LedgerResult<User> {
        users::insert_user(
            &self.pool,
            Uuid::new_v4(),
            &new_user.username,
            &new_user.password_hash,
            new_user.starting_cash,
        )
        .await
    }

    async fn find_credential(&self, username: &str) -> LedgerResult<Option<UserCredential>> {
        let row = users::get_user_by_username(&self.pool, username).await?;
        Ok(row.map(UserCredential::from))
    }

    async fn cash_balance(&self, user_id: Uuid) -> LedgerResult<Decimal> {
        users::get_user_cash(&self.pool, user_id)
            .await?
            .ok_or(LedgerError::UnknownUser(user_id))
    }

    async fn holdings(&self, user_id: Uuid) -> LedgerResult<Vec<Holding>> {
        holdings::list_holdings_for_user(&self.pool, user_id)
            .await?
            .into_iter()
            .map(Holding::try_from)
            .collect()
    }

    async fn events_page(
        &self,
        user_id: Uuid,
        after: Option<i64>,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        Ok(events::list_events_page(&self.pool, user_id, after, limit).await?)
    }
}

/// Open transaction holding `FOR UPDATE` on the user's row. Dropping it
/// without commit rolls back.
pub struct PgTx {
    user_id: Uuid,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgTx {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    async fn cash(&mut self) -> LedgerResult<Decimal> {
        users::get_user_cash(&mut *self.tx, self.user_id)
            .await?
            .ok_or(LedgerError::UnknownUser(self.user_id))
    }

    async fn set_cash(&mut self, cash: Decimal) -> LedgerResult<()> {
        Ok(users::update_user_cash(&mut *self.tx, self.user_id, cash).await?)
    }

    async fn holding(&mut self, symbol: &str) -> LedgerResult<Option<Holding>> {
        holdings::get_holding_for_update(&mut *self.tx, self.user_id, symbol)
            .await?
            .map(Holding::try_from)
            .transpose()
    }

    async fn put_holding(&mut self, holding: &Holding) -> LedgerResult<()> {
        holdings::upsert_holding(
            &mut *self.tx,
            self.user_id,
            &holding.symbol,
            &holding.display_name,
            to_db_qty(holding.shares)?,
            holding.average_price,
        )
        .await?;
        Ok(())
    }

    async fn remove_holding(&mut self, symbol: &str) -> LedgerResult<()> {
        Ok(holdings::delete_holding(&mut *self.tx, self.user_id, symbol).await?)
    }

    async fn insert_event(&mut self, event: &NewLedgerEvent) -> LedgerResult<LedgerEvent> {
        Ok(events::insert_event(&mut *self.tx, self.user_id, event).await?)
    }

    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

//! Storage layer: the transactional store contract plus its PostgreSQL and
//! in-memory backends.

mod events;
mod holdings;
pub mod memory;
mod pg_store;
mod pool;
mod users;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::types::event::{LedgerEvent, NewLedgerEvent};
use crate::types::holding::Holding;
use crate::types::user::{NewUser, User, UserCredential};

pub use events::{EventRow, insert_event, list_events_page};
pub use holdings::{
    HoldingRow, delete_holding, get_holding_for_update, list_holdings_for_user, upsert_holding,
};
pub use memory::{FailPoint, MemoryStore};
pub use pg_store::{PgStore, PgTx};
pub use pool::{create_pool_and_migrate, run_migrations};
pub use sqlx::PgPool;
pub use users::{
    UserRow, get_user_by_username, get_user_cash, insert_user, lock_user_cash, update_user_cash,
};

/// A store that can open user-scoped transactions and answer read queries.
///
/// `begin` serializes against every other open transaction for the same
/// user; transactions for different users never wait on each other.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Opens a transaction holding the user's lock. Fails with
    /// `UnknownUser` if the user does not exist.
    async fn begin(&self, user_id: Uuid) -> LedgerResult<Self::Tx>;

    async fn create_user(&self, new_user: NewUser) -> LedgerResult<User>;

    /// Looks up login material by lowercase username.
    async fn find_credential(&self, username: &str) -> LedgerResult<Option<UserCredential>>;

    async fn cash_balance(&self, user_id: Uuid) -> LedgerResult<Decimal>;

    /// Current holdings ordered by symbol.
    async fn holdings(&self, user_id: Uuid) -> LedgerResult<Vec<Holding>>;

    /// Up to `limit` events with id greater than `after`, oldest first.
    async fn events_page(
        &self,
        user_id: Uuid,
        after: Option<i64>,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEvent>>;
}

/// Open transaction scoped to one user.
///
/// Nothing written through the handle is visible to other readers until
/// [`LedgerTx::commit`]. Dropping the handle without committing rolls back.
#[async_trait]
pub trait LedgerTx: Send {
    fn user_id(&self) -> Uuid;

    async fn cash(&mut self) -> LedgerResult<Decimal>;

    async fn set_cash(&mut self, cash: Decimal) -> LedgerResult<()>;

    /// `symbol` must already be normalized.
    async fn holding(&mut self, symbol: &str) -> LedgerResult<Option<Holding>>;

    async fn put_holding(&mut self, holding: &Holding) -> LedgerResult<()>;

    async fn remove_holding(&mut self, symbol: &str) -> LedgerResult<()>;

    async fn insert_event(&mut self, event: &NewLedgerEvent) -> LedgerResult<LedgerEvent>;

    async fn commit(self) -> LedgerResult<()>;
}

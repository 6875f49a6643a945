//! In-memory store: per-user books behind owned mutex guards.
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. A
//! transaction works on a copy of the user's book and swaps it in on
//! commit, so a dropped transaction leaves nothing behind. Failures can be
//! injected at any write step to exercise rollback and retry paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::persistence::{LedgerStore, LedgerTx};
use crate::types::event::{LedgerEvent, NewLedgerEvent};
use crate::types::holding::Holding;
use crate::types::user::{NewUser, User, UserCredential};

/// Write steps at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SetCash,
    PutHolding,
    RemoveHolding,
    InsertEvent,
    Commit,
}

#[derive(Debug, Clone)]
struct UserBook {
    cash: Decimal,
    holdings: BTreeMap<String, Holding>,
    events: Vec<LedgerEvent>,
}

#[derive(Default)]
struct FaultPlan {
    queued: StdMutex<Vec<(FailPoint, LedgerError)>>,
}

impl FaultPlan {
    fn push(&self, point: FailPoint, err: LedgerError) {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((point, err));
    }

    /// Pops the first fault queued for `point`, if any.
    fn check(&self, point: FailPoint) -> LedgerResult<()> {
        let mut queued = self
            .queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match queued.iter().position(|(p, _)| *p == point) {
            Some(idx) => Err(queued.remove(idx).1),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    books: RwLock<HashMap<Uuid, Arc<Mutex<UserBook>>>>,
    credentials: RwLock<HashMap<String, UserCredential>>,
    next_event_id: Arc<AtomicI64>,
    faults: Arc<FaultPlan>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next write at `point` fail with `err`. Faults queue up, so
    /// calling this twice for the same point fails two writes.
    pub fn fail_once(&self, point: FailPoint, err: LedgerError) {
        self.faults.push(point, err);
    }

    async fn book(&self, user_id: Uuid) -> LedgerResult<Arc<Mutex<UserBook>>> {
        self.books
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(LedgerError::UnknownUser(user_id))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self, user_id: Uuid) -> LedgerResult<MemoryTx> {
        let guard = self.book(user_id).await?.lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            user_id,
            guard,
            working,
            faults: self.faults.clone(),
            next_event_id: self.next_event_id.clone(),
        })
    }

    async fn create_user(&self, new_user: NewUser) -> LedgerResult<User> {
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&new_user.username) {
            return Err(LedgerError::UsernameTaken(new_user.username));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            cash: new_user.starting_cash,
            created_at: Utc::now(),
        };
        credentials.insert(
            new_user.username.clone(),
            UserCredential {
                user_id: user.id,
                username: new_user.username,
                password_hash: new_user.password_hash,
            },
        );
        self.books.write().await.insert(
            user.id,
            Arc::new(Mutex::new(UserBook {
                cash: user.cash,
                holdings: BTreeMap::new(),
                events: Vec::new(),
            })),
        );
        Ok(user)
    }

    async fn find_credential(&self, username: &str) -> LedgerResult<Option<UserCredential>> {
        Ok(self.credentials.read().await.get(username).cloned())
    }

    async fn cash_balance(&self, user_id: Uuid) -> LedgerResult<Decimal> {
        Ok(self.book(user_id).await?.lock().await.cash)
    }

    async fn holdings(&self, user_id: Uuid) -> LedgerResult<Vec<Holding>> {
        let book = self.book(user_id).await?;
        let guard = book.lock().await;
        Ok(guard.holdings.values().cloned().collect())
    }

    async fn events_page(
        &self,
        user_id: Uuid,
        after: Option<i64>,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let book = self.book(user_id).await?;
        let guard = book.lock().await;
        // Event ids only grow, so the page start is a binary search away.
        let start = guard
            .events
            .partition_point(|event| after.is_some_and(|after| event.id <= after));
        Ok(guard.events[start..].iter().take(limit).cloned().collect())
    }
}

pub struct MemoryTx {
    user_id: Uuid,
    guard: OwnedMutexGuard<UserBook>,
    working: UserBook,
    faults: Arc<FaultPlan>,
    next_event_id: Arc<AtomicI64>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    async fn cash(&mut self) -> LedgerResult<Decimal> {
        Ok(self.working.cash)
    }

    async fn set_cash(&mut self, cash: Decimal) -> LedgerResult<()> {
        self.faults.check(FailPoint::SetCash)?;
        self.working.cash = cash;
        Ok(())
    }

    async fn holding(&mut self, symbol: &str) -> LedgerResult<Option<Holding>> {
        Ok(self.working.holdings.get(symbol).cloned())
    }

    async fn put_holding(&mut self, holding: &Holding) -> LedgerResult<()> {
        self.faults.check(FailPoint::PutHolding)?;
        self.working
            .holdings
            .insert(holding.symbol.clone(), holding.clone());
        Ok(())
    }

    async fn remove_holding(&mut self, symbol: &str) -> LedgerResult<()> {
        self.faults.check(FailPoint::RemoveHolding)?;
        self.working.holdings.remove(symbol);
        Ok(())
    }

    async fn insert_event(&mut self, event: &NewLedgerEvent) -> LedgerResult<LedgerEvent> {
        self.faults.check(FailPoint::InsertEvent)?;
        // Ids burnt by rolled-back transactions leave gaps, like a sequence.
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = LedgerEvent {
            id,
            user_id: self.user_id,
            symbol: event.symbol.clone(),
            display_name: event.display_name.clone(),
            share_delta: event.share_delta,
            price: event.price,
            timestamp: event.timestamp,
        };
        self.working.events.push(stored.clone());
        Ok(stored)
    }

    async fn commit(mut self) -> LedgerResult<()> {
        self.faults.check(FailPoint::Commit)?;
        *self.guard = self.working;
        Ok(())
    }
}

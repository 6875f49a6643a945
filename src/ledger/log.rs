//! Append-only transaction log and its lazy history stream.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::{Stream, stream};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::persistence::{LedgerStore, LedgerTx};
use crate::types::event::{LedgerEvent, NewLedgerEvent};

/// Events fetched per round trip while streaming history.
pub const HISTORY_PAGE_SIZE: usize = 256;

/// Record one trade. Only fails if the store does.
pub async fn append<T: LedgerTx>(tx: &mut T, event: NewLedgerEvent) -> LedgerResult<LedgerEvent> {
    if event.share_delta == 0 {
        return Err(LedgerError::invalid("ledger events must move shares"));
    }
    tx.insert_event(&event).await
}

struct HistoryCursor<S> {
    store: Arc<S>,
    user_id: Uuid,
    after: Option<i64>,
    buffered: VecDeque<LedgerEvent>,
    exhausted: bool,
}

/// Every event of the user, oldest first.
///
/// The stream pulls pages lazily and owns its store handle, so it can back
/// a streaming response body. Calling this again starts over from the
/// first event.
pub fn history<S: LedgerStore>(
    store: Arc<S>,
    user_id: Uuid,
) -> impl Stream<Item = LedgerResult<LedgerEvent>> + Send + 'static {
    let cursor = HistoryCursor {
        store,
        user_id,
        after: None,
        buffered: VecDeque::new(),
        exhausted: false,
    };
    stream::try_unfold(cursor, |mut cursor| async move {
        if cursor.buffered.is_empty() && !cursor.exhausted {
            let page = cursor
                .store
                .events_page(cursor.user_id, cursor.after, HISTORY_PAGE_SIZE)
                .await?;
            cursor.exhausted = page.len() < HISTORY_PAGE_SIZE;
            if let Some(last) = page.last() {
                cursor.after = Some(last.id);
            }
            cursor.buffered.extend(page);
        }
        Ok::<_, LedgerError>(cursor.buffered.pop_front().map(|event| (event, cursor)))
    })
}

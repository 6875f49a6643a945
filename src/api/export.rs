//! CSV download of the user's ledger events, streamed row by row.

use axum::{
    body::Body,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use futures::{StreamExt, TryStreamExt, future, stream};
use thiserror::Error;
use tracing::error;

use crate::api::auth::AuthUser;
use crate::api::error::ApiResult;
use crate::api::routes::AppState;
use crate::error::LedgerError;
use crate::persistence::LedgerStore;
use crate::types::event::LedgerEvent;

pub const EXPORT_HEADER: [&str; 4] = ["company", "product", "quantity", "price"];
pub const EXPORT_FILENAME: &str = "log.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// One CSV line, terminator included.
pub fn csv_line<I, T>(record: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(record)?;
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

pub fn event_line(event: &LedgerEvent) -> Result<Vec<u8>, ExportError> {
    csv_line([
        event.display_name.clone(),
        event.symbol.clone(),
        event.share_delta.to_string(),
        event.price.to_string(),
    ])
}

pub async fn export_history<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
) -> ApiResult<Response> {
    // Reject unknown users before the 200 status goes out.
    state.ledger.cash_balance(user.user_id).await?;

    let header = stream::once(future::ready(csv_line(EXPORT_HEADER)));
    let rows = state
        .ledger
        .history(user.user_id)
        .map_err(ExportError::from)
        .and_then(|event| future::ready(event_line(&event)));
    let body = header
        .chain(rows)
        .inspect_err(|err| error!(error = %err, "export stream aborted"));

    Ok((
        [
            (CONTENT_TYPE, "text/csv".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

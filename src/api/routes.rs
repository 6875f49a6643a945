use std::sync::Arc;

use axum::{
    Router,
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
    },
    routing::{get, post},
};
use rust_decimal::Decimal;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::api::{auth, export, portfolio};
use crate::ledger::LedgerService;
use crate::persistence::LedgerStore;

/// Shared state handed to every handler.
pub struct AppState<S> {
    pub ledger: LedgerService<S>,
    pub jwt_secret: Arc<[u8]>,
    /// Cash credited to newly registered users.
    pub starting_cash: Decimal,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            jwt_secret: self.jwt_secret.clone(),
            starting_cash: self.starting_cash,
        }
    }
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register::<S>))
        .route("/auth/login", post(auth::login::<S>))
        .route("/portfolio", get(portfolio::portfolio::<S>))
        .route("/buy", post(portfolio::buy::<S>))
        .route("/sell", post(portfolio::sell::<S>))
        .route("/history", get(portfolio::history::<S>))
        .route("/export", get(export::export_history::<S>))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Portfolio, trade and history endpoints. Every handler acts only on the
//! authenticated user's rows.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::api::auth::AuthUser;
use crate::api::error::ApiResult;
use crate::api::routes::AppState;
use crate::ledger::{Execution, Portfolio};
use crate::persistence::LedgerStore;
use crate::types::event::LedgerEvent;
use crate::types::order::{BuyOrder, SellOrder};

pub async fn portfolio<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
) -> ApiResult<Json<Portfolio>> {
    Ok(Json(state.ledger.portfolio(user.user_id).await?))
}

pub async fn buy<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    payload: Result<Json<BuyOrder>, JsonRejection>,
) -> ApiResult<Json<Execution>> {
    let Json(order) = payload?;
    Ok(Json(state.ledger.buy(user.user_id, &order).await?))
}

pub async fn sell<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    payload: Result<Json<SellOrder>, JsonRejection>,
) -> ApiResult<Json<Execution>> {
    let Json(order) = payload?;
    Ok(Json(state.ledger.sell(user.user_id, &order).await?))
}

pub async fn history<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<LedgerEvent>>> {
    Ok(Json(state.ledger.history_list(user.user_id).await?))
}

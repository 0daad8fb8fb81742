//! Axum router and HTTP handlers.
//!
//! `build_router` is the single entry point; `serve` attaches the trace
//! layer after this call so `tests/` can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use super::types::{
    CreateOrderRequest, HealthResponse, ListOrdersQuery, TransitionRequest, UpdateOrderRequest,
    ValidateRequest, ValidateResponse,
};
use super::{ApiError, AppState};
use crate::error::Error;
use crate::order::OrderStatus;
use crate::workflow::Role;

/// Orders returned by `GET /orders` when no holder is given.
const DEFAULT_LIST_LIMIT: usize = 100;

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:cle", get(get_order).put(update_order))
        .route("/orders/:cle/transition", post(transition_order))
        .route("/inbox/:role/:actor_id", get(inbox))
        .route("/validate", post(validate))
        .with_state(state)
}

/// Unwrap a JSON body, turning extractor rejections into 400s.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError(Error::invalid_input(rejection.body_text())))
}

pub(crate) async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        service: "circle".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub(crate) async fn stats(State(st): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let service = st.service.lock().await;
    Ok(Json(service.stats()?))
}

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let service = st.service.lock().await;
    let order = service.create_order(req.data, &req.creator_id, &req.broker_id)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) =
        query.map_err(|rejection| ApiError(Error::invalid_input(rejection.body_text())))?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let service = st.service.lock().await;
    let orders = match query.holder.as_deref() {
        Some(holder) => service.orders_for_holder(holder, status)?,
        None => service
            .storage()
            .recent_orders(query.limit.unwrap_or(DEFAULT_LIST_LIMIT), status)?,
    };
    Ok(Json(orders))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(cle): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = st.service.lock().await;
    Ok(Json(service.order_with_history(&cle)?))
}

pub(crate) async fn update_order(
    State(st): State<Arc<AppState>>,
    Path(cle): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let service = st.service.lock().await;
    Ok(Json(service.update_order(&cle, req.data, &req.modifier_id)?))
}

pub(crate) async fn transition_order(
    State(st): State<Arc<AppState>>,
    Path(cle): Path<String>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let service = st.service.lock().await;
    let order = service.transition(
        &cle,
        req.action,
        &req.actor_id,
        &req.target_id,
        req.reason.as_deref(),
    )?;
    Ok(Json(order))
}

pub(crate) async fn inbox(
    State(st): State<Arc<AppState>>,
    Path((role, actor_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let role: Role = role.parse()?;
    let service = st.service.lock().await;
    Ok(Json(service.inbox(role, &actor_id)?))
}

pub(crate) async fn validate(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let service = st.service.lock().await;
    let errors = service.validate(&req.data);
    Ok(Json(ValidateResponse {
        valid: errors.is_empty(),
        errors,
    }))
}

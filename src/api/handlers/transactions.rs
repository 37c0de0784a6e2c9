//! Transaction handlers: list and record.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{DateRangeQuery, RecordTransactionsRequest, RecordTransactionsResponse};
use crate::app_state::AppState;
use crate::domain::{OwnerId, Transaction};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::NewTransaction;

/// `GET /transactions/{ownerId}`: List an owner's transactions.
///
/// # Errors
///
/// Returns [`GatewayError`] on malformed bounds or a store failure.
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{owner_id}",
    tag = "Transactions",
    summary = "List transactions",
    description = "Returns the owner's transactions newest first, optionally within inclusive date bounds.",
    params(
        ("owner_id" = String, Path, description = "Owner identifier"),
        DateRangeQuery,
    ),
    responses(
        (status = 200, description = "Transactions", body = Vec<Transaction>),
        (status = 400, description = "Malformed bounds", body = ErrorResponse),
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&owner_id)?;
    let (from, to) = range.bounds()?;
    let txs = state.transactions.list(&owner, from, to).await?;
    Ok(Json(txs))
}

/// `POST /transactions`: Record a batch of transactions.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid input or a store failure. Nothing
/// is stored if any item is rejected.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "Transactions",
    summary = "Record transactions",
    description = "Stores a batch of income and expense transactions for one owner. Expenses without a category are categorized by keyword.",
    request_body = RecordTransactionsRequest,
    responses(
        (status = 201, description = "Transactions recorded", body = RecordTransactionsResponse),
        (status = 400, description = "Invalid batch", body = ErrorResponse),
    )
)]
pub async fn record_transactions(
    State(state): State<AppState>,
    Json(req): Json<RecordTransactionsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&req.owner_id)?;
    let batch: Vec<NewTransaction> = req.transactions.into_iter().map(Into::into).collect();
    let transactions = state.transactions.record(&owner, batch).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordTransactionsResponse {
            recorded: transactions.len(),
            transactions,
        }),
    ))
}

/// Transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(record_transactions))
        .route("/transactions/{owner_id}", get(list_transactions))
}

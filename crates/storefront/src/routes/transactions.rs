//! Transaction ledger route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sillage_core::{Email, TransactionId, TransactionStatus, UserId};

use super::extract::{JsonBody, QueryParams};
use super::parse_id;
use crate::error::{AppError, Result};
use crate::models::{LedgerSummary, Transaction, TransactionQuery};
use crate::services::transactions::{StatusUpdate, TransactionSubmission};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

impl ListParams {
    fn into_query(self) -> Result<TransactionQuery> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<TransactionStatus>)
            .transpose()?;
        Ok(TransactionQuery {
            status,
            limit: self.limit,
            ..TransactionQuery::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub email: Option<String>,
}

/// A page of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    pub count: usize,
}

impl From<Vec<Transaction>> for TransactionList {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self {
            count: transactions.len(),
            transactions,
        }
    }
}

fn transaction_id(raw: &str) -> Result<TransactionId> {
    parse_id(raw, "Transaction not found")
}

fn user_id(raw: &str) -> Result<UserId> {
    UserId::parse(raw).map_err(|e| AppError::validation(e.to_string()))
}

fn created(message: &str, transaction: &Transaction) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "message": message,
            "transactionId": transaction.id,
            "transaction": transaction,
        })),
    )
}

/// POST /api/transactions
pub async fn create(
    State(state): State<AppState>,
    JsonBody(submission): JsonBody<TransactionSubmission>,
) -> Result<(StatusCode, Json<Value>)> {
    let transaction = state.transactions().create(submission).await?;
    Ok(created("Transaction created successfully", &transaction))
}

/// POST /api/transactions/checkout/{user}
pub async fn checkout(
    State(state): State<AppState>,
    Path(user): Path<String>,
    JsonBody(body): JsonBody<CheckoutBody>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = user_id(&user)?;
    let email = body
        .email
        .ok_or_else(|| AppError::validation("email is required"))?;
    let transaction = state.transactions().checkout(&user, &email).await?;
    Ok(created("Checkout complete", &transaction))
}

/// GET /api/transactions
pub async fn index(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<TransactionList>> {
    let query = params.into_query()?;
    Ok(Json(state.transactions().list(&query).await?.into()))
}

/// GET /api/transactions/summary
pub async fn summary(State(state): State<AppState>) -> Result<Json<LedgerSummary>> {
    Ok(Json(state.transactions().summary().await?))
}

/// GET /api/transactions/user/{user}
pub async fn for_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<TransactionList>> {
    let query = TransactionQuery {
        user_id: Some(user_id(&user)?),
        ..TransactionQuery::default()
    };
    Ok(Json(state.transactions().list(&query).await?.into()))
}

/// GET /api/transactions/email/{email}
pub async fn for_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<TransactionList>> {
    let email = Email::parse(&email).map_err(|e| AppError::validation(e.to_string()))?;
    let query = TransactionQuery {
        email: Some(email),
        ..TransactionQuery::default()
    };
    Ok(Json(state.transactions().list(&query).await?.into()))
}

/// GET /api/transactions/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>> {
    let id = transaction_id(&id)?;
    Ok(Json(state.transactions().get(id).await?))
}

/// PATCH /api/transactions/{id}
///
/// The status is committed even when the customer notification fails; the
/// `notification` field of the response reports what happened to it.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusBody>,
) -> Result<Json<Value>> {
    // The status is checked before the id so a bad status always reads as
    // a validation error.
    let status: TransactionStatus = body
        .status
        .as_deref()
        .ok_or_else(|| AppError::validation("status is required"))?
        .trim()
        .parse()?;
    let id = transaction_id(&id)?;

    let StatusUpdate {
        transaction,
        notification,
    } = state
        .transactions()
        .update_status(id, status)
        .await?;
    Ok(Json(json!({
        "message": "Transaction updated successfully",
        "transaction": transaction,
        "notification": notification,
    })))
}

/// DELETE /api/transactions/{id}
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let id = transaction_id(&id)?;
    state.transactions().delete(id).await?;
    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

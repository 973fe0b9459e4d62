//! Transaction HTTP handlers.
//!
//! This module implements the money-movement API endpoints:
//! - POST /api/v1/transactions/deposit - Credit the caller's wallet
//! - POST /api/v1/transactions/withdraw - Debit the caller's wallet
//! - POST /api/v1/transactions/transfer - Move money to another wallet
//! - GET /api/v1/transactions - Transaction history, newest first
//! - GET /api/v1/transactions/:id - Get one transaction
//!
//! The handlers are thin: the ledger service owns validation, atomicity,
//! and card allocation; the authenticated user id comes from the auth
//! middleware and is trusted as-is.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{
        DepositRequest, TransactionResponse, TransferRequest, WithdrawRequest,
    },
    services::ledger_service,
};

/// Deposit money into the caller's wallet.
///
/// # Request Body
///
/// ```json
/// {
///   "amount_cents": 100000,
///   "description": "Salary top-up",
///   "card_id": "550e8400-..."
/// }
/// ```
///
/// # Response (201)
///
/// The committed transaction, including its unique `reference`.
pub async fn deposit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = ledger_service::deposit(&state, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Withdraw money from the caller's wallet.
///
/// # Validation
///
/// - Amount must be positive and within the single-operation ceiling
/// - Wallet must cover the amount
/// - An explicit card must be active and cover the whole amount
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = ledger_service::withdraw(&state, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Transfer money to another wallet by account number.
///
/// # Atomicity
///
/// Both wallets, all touched cards, and the transaction row are written in
/// a single database transaction; either everything commits or nothing
/// does.
pub async fn transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = ledger_service::transfer(&state, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Transaction history for the caller, newest first.
pub async fn history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = ledger_service::history(&state.pool, auth.user_id).await?;

    let responses: Vec<TransactionResponse> = transactions.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Get one transaction by id.
///
/// Returns 404 if the transaction does not exist or does not involve the
/// caller as sender or receiver.
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction =
        ledger_service::get_transaction(&state.pool, auth.user_id, transaction_id).await?;

    Ok(Json(transaction.into()))
}

//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Every fallible path in the service returns this enum. Variants fall into
/// four groups:
///
/// - **Validation**: rejected before any write (`InvalidAmount`,
///   `InvalidRequest`)
/// - **Not found**: wallet, card, recipient, transaction or notification
///   absent; rejected before any write
/// - **Business rules**: insufficient funds, frozen card, self transfer,
///   per-operation ceiling, card deletion rules
/// - **Infrastructure**: database errors, bad credentials
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, rollback).
    ///
    /// Wraps any sqlx::Error via `#[from]`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing, unknown, or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid access token")]
    InvalidToken,

    /// The authenticated user has no wallet.
    #[error("Wallet not found")]
    WalletNotFound,

    /// No wallet exists for the given recipient account number.
    #[error("Recipient account not found")]
    RecipientNotFound,

    /// Card does not exist or does not belong to the caller's wallet.
    #[error("Card not found")]
    CardNotFound,

    /// Transaction does not exist or does not involve the caller.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Notification does not exist or does not belong to the caller.
    #[error("Notification not found")]
    NotificationNotFound,

    /// Registration attempted with a username that is already taken.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Username is already taken")]
    UsernameTaken,

    /// Wallet balance does not cover the requested debit.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// An explicitly selected card does not cover the requested debit.
    ///
    /// Only raised in explicit-card mode; auto-split never raises it.
    #[error("Insufficient card funds")]
    InsufficientCardFunds,

    /// An explicitly selected card is blocked.
    #[error("Card is frozen")]
    CardFrozen,

    /// Sender and receiver account numbers are identical.
    #[error("Cannot transfer to your own account")]
    SelfTransfer,

    /// Requested amount exceeds the per-operation withdrawal ceiling.
    #[error("Amount exceeds the single-operation limit")]
    LimitExceeded,

    /// A card with a non-zero balance cannot be deleted.
    #[error("Card still holds a balance")]
    CardHasBalance,

    /// The last remaining card on a wallet cannot be deleted.
    #[error("Cannot delete the last card on a wallet")]
    LastCard,

    /// Amount is zero, negative, or otherwise not a valid money value.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Amount must be positive")]
    InvalidAmount,

    /// Request body or parameters are invalid.
    ///
    /// The String carries details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// Allows handlers to return `Result<T, AppError>` and have errors
/// automatically converted into JSON responses of the form:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Business-rule violations map to 422 Unprocessable Entity, missing
/// resources to 404, validation to 400, auth to 401, and database errors to
/// 500 with details hidden from the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::WalletNotFound => {
                (StatusCode::NOT_FOUND, "wallet_not_found", self.to_string())
            }
            AppError::RecipientNotFound => (
                StatusCode::NOT_FOUND,
                "recipient_not_found",
                self.to_string(),
            ),
            AppError::CardNotFound => (StatusCode::NOT_FOUND, "card_not_found", self.to_string()),
            AppError::TransactionNotFound => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                self.to_string(),
            ),
            AppError::NotificationNotFound => (
                StatusCode::NOT_FOUND,
                "notification_not_found",
                self.to_string(),
            ),
            AppError::UsernameTaken => (StatusCode::CONFLICT, "username_taken", self.to_string()),
            AppError::InsufficientFunds => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                self.to_string(),
            ),
            AppError::InsufficientCardFunds => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_card_funds",
                self.to_string(),
            ),
            AppError::CardFrozen => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "card_frozen",
                self.to_string(),
            ),
            AppError::SelfTransfer => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "self_transfer",
                self.to_string(),
            ),
            AppError::LimitExceeded => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "limit_exceeded",
                self.to_string(),
            ),
            AppError::CardHasBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "card_has_balance",
                self.to_string(),
            ),
            AppError::LastCard => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "last_card",
                self.to_string(),
            ),
            AppError::InvalidAmount => {
                (StatusCode::BAD_REQUEST, "invalid_amount", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

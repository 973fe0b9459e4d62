//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: immutable ledger log entry
//! - Request types for deposit, withdraw, and transfer operations
//! - `TransactionResponse`: response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a transaction record from the database.
///
/// # Append-only Log
///
/// Maps to the `transactions` table. Rows are written once by the ledger
/// engine after all balance mutations in the same database transaction and
/// never updated. Failed attempts are not persisted, so `status` is always
/// "COMPLETED" for stored rows.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// Human-readable unique reference: `"<DEP|WDL|TRF>-<8 uppercase hex>"`
    ///
    /// This is the only externally meaningful identifier besides `id`;
    /// uniqueness is enforced by the database.
    pub reference: String,

    /// "DEPOSIT", "WITHDRAW", or "TRANSFER"
    pub transaction_type: String,

    /// "COMPLETED" for every persisted row
    pub status: String,

    /// Debited party (withdraw, transfer)
    pub sender_id: Option<Uuid>,

    /// Credited party (deposit, transfer)
    pub receiver_id: Option<Uuid>,

    /// The card actually debited or credited; for an auto-split debit this
    /// is the first card that contributed a non-zero amount
    pub card_id: Option<Uuid>,

    /// Last four digits of that card
    pub card_last4: Option<String>,

    /// Amount in minor units, always positive
    pub amount_cents: i64,

    /// Human-readable description
    pub description: Option<String>,

    /// When the transaction was committed
    pub created_at: DateTime<Utc>,
}

/// Request to deposit money into the caller's wallet.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount_cents": 100000,
///   "description": "Salary top-up",
///   "card_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// `card_id` is optional; without it the wallet's default card receives the
/// credit.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount_cents: i64,
    pub description: Option<String>,
    pub card_id: Option<Uuid>,
}

/// Request to withdraw money from the caller's wallet.
///
/// # Validation
///
/// - Wallet must cover the amount
/// - Amount must be positive and within the single-operation ceiling
/// - An explicit `card_id` must belong to the wallet, be active, and cover
///   the whole amount; without one the debit is auto-split across cards
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount_cents: i64,
    pub description: Option<String>,
    pub card_id: Option<Uuid>,
}

/// Request to transfer money to another wallet by account number.
///
/// # JSON Example
///
/// ```json
/// {
///   "receiver_account_number": "0123456789",
///   "amount_cents": 25000,
///   "description": "Rent"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub receiver_account_number: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub card_id: Option<Uuid>,
}

/// Response returned for transaction operations and history reads.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub reference: String,
    pub transaction_type: String,
    pub status: String,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
    pub card_last4: Option<String>,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            reference: transaction.reference,
            transaction_type: transaction.transaction_type,
            status: transaction.status,
            sender_id: transaction.sender_id,
            receiver_id: transaction.receiver_id,
            card_id: transaction.card_id,
            card_last4: transaction.card_last4,
            amount_cents: transaction.amount_cents,
            description: transaction.description,
            created_at: transaction.created_at,
        }
    }
}

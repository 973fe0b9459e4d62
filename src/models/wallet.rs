//! Wallet data model and API response type.
//!
//! A wallet is a user's single currency balance plus a unique, immutable
//! account number. It is created exactly once at registration and its
//! balance is mutated only by the ledger engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a wallet record from the database.
///
/// # Balance Storage
///
/// Balances are stored as `i64` minor units (kobo) to avoid floating-point
/// precision issues. The database enforces `balance_cents >= 0` with a CHECK
/// constraint as a last line of defense behind the engine's own checks.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// Owning user; exactly one wallet per user
    pub user_id: Uuid,

    /// 10-digit account number, unique and immutable
    pub account_number: String,

    /// Current balance in minor units
    pub balance_cents: i64,

    /// Currency code (ISO 4217)
    pub currency: String,

    /// Wallet status ("active" in normal operation)
    pub status: String,

    /// Timestamp when the wallet was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last balance update
    pub updated_at: DateTime<Utc>,
}

/// Response body for wallet endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "account_number": "0123456789",
///   "balance_cents": 100000,
///   "currency": "NGN",
///   "status": "active",
///   "created_at": "2025-06-20T10:00:00Z",
///   "updated_at": "2025-06-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub account_number: String,
    pub balance_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            account_number: wallet.account_number,
            balance_cents: wallet.balance_cents,
            currency: wallet.currency,
            status: wallet.status,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

//! User and access-token models.
//!
//! Access tokens are stored in the database as SHA-256 hashes. The raw token
//! is generated at registration, returned once, and never recoverable
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{card::CardResponse, wallet::WalletResponse};

/// Represents a user record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Login/display handle, unique across the system
    pub username: String,

    /// Legal name; also used as the holder name on issued cards
    pub full_name: String,

    /// Timestamp when the user registered
    pub created_at: DateTime<Utc>,
}

/// Represents an access-token record from the database.
///
/// When a request comes in with `Bearer abc123`, we hash `abc123` with
/// SHA-256 and look the hash up here. Inactive tokens are rejected, which
/// provides a way to revoke access without deleting the record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub id: Uuid,
    pub user_id: Uuid,

    /// SHA-256 hash of the raw token (64 hex characters)
    pub token_hash: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for registration.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "ada",
///   "full_name": "Ada Obi"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
}

/// Response returned once at registration.
///
/// Registration creates the user, their wallet, their first (default)
/// PLATINUM card, and an access token in a single atomic write. The raw
/// `access_token` and the card CVV appear only in this response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub wallet: WalletResponse,
    pub card: CardResponse,

    /// Raw bearer token; shown exactly once
    pub access_token: String,
}

//! Notification models for the in-app feed and the notifier gateway.
//!
//! # Notification Flow
//!
//! 1. The ledger engine commits a transaction
//! 2. One event per affected user is built (`NotificationEvent`)
//! 3. A spawned task inserts the in-app row and, when a gateway is
//!    configured, POSTs a signed payload for email/push fan-out
//! 4. The gateway verifies the `X-Notifier-Signature` header with the
//!    shared secret
//!
//! Delivery is fully decoupled from transaction success: a committed
//! transaction never becomes failed because a notification could not be
//! delivered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Event kind for a credited deposit.
pub const KIND_DEPOSIT: &str = "DEPOSIT";
/// Event kind for a debited withdrawal.
pub const KIND_WITHDRAW: &str = "WITHDRAW";
/// Event kind for the sending side of a transfer.
pub const KIND_TRANSFER_SENT: &str = "TRANSFER_SENT";
/// Event kind for the receiving side of a transfer.
pub const KIND_TRANSFER_RECEIVED: &str = "TRANSFER_RECEIVED";

/// In-app notification row.
///
/// Maps to the `notifications` table. Email and push channels leave no rows
/// here; they are the gateway's concern.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub amount_cents: Option<i64>,
    pub reference: Option<String>,
    pub card_last4: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Post-commit event describing one user's view of a transaction.
///
/// Built by the ledger engine after commit and handed to the notifier; the
/// same struct is both the in-app row source and the gateway payload body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: Uuid,

    /// One of the `KIND_*` constants
    #[serde(rename = "type")]
    pub kind: String,

    pub title: String,
    pub message: String,
    pub amount_cents: i64,
    pub reference: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
}

/// Envelope POSTed to the notifier gateway.
///
/// # Example
///
/// ```json
/// {
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-06-20T10:30:00Z",
///   "event": {
///     "user_id": "...",
///     "type": "TRANSFER_SENT",
///     "title": "Transfer sent",
///     "message": "You sent NGN 250.00 (TRF-1A2B3C4D)",
///     "amount_cents": 25000,
///     "reference": "TRF-1A2B3C4D"
///   }
/// }
/// ```
///
/// The request carries an `X-Notifier-Signature: sha256=<hex>` header
/// computed as HMAC-SHA256(secret, body).
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Unique identifier for this delivery
    pub event_id: Uuid,

    /// When the payload was built
    pub created_at: DateTime<Utc>,

    /// The event itself
    pub event: NotificationEvent,
}

impl GatewayPayload {
    /// Wrap an event for delivery.
    pub fn new(event: NotificationEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            created_at: Utc::now(),
            event,
        }
    }
}

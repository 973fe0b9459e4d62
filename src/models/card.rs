//! Card data models and API request/response types.
//!
//! A card is a virtual debit instrument tied to a wallet; a wallet may hold
//! several. At most one card per wallet is flagged as the default (enforced
//! by a partial unique index), and the default card absorbs credits and
//! debits first when the caller does not pick a card explicitly.
//!
//! # CVV Handling
//!
//! The CVV is write-once: it is returned in the creation response and never
//! exposed again. `Card` deliberately does not derive `Serialize`; all API
//! output goes through [`CardResponse`], which omits the CVV unless
//! explicitly attached via [`CardResponse::with_cvv`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Card status value for a usable card.
pub const STATUS_ACTIVE: &str = "active";
/// Card status value for a frozen card; blocked cards reject explicit debits.
pub const STATUS_BLOCKED: &str = "blocked";

/// Represents a card record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Card {
    /// Unique identifier for this card
    pub id: Uuid,

    /// Owning wallet
    pub wallet_id: Uuid,

    /// 16-digit card number, unique across the system
    pub card_number: String,

    /// 3-digit verification code; never serialized after creation
    pub cvv: String,

    /// Expiry, five years after issuance
    pub expiry_date: DateTime<Utc>,

    /// Holder name printed on the card
    pub card_holder_name: String,

    /// Always "DEBIT" for issued cards
    pub card_type: String,

    /// Card tier, "PLATINUM" unless requested otherwise
    pub card_tier: String,

    /// Card network, derived from the leading digit of the number
    pub network: String,

    /// Balance in minor units; tracks a share of the wallet balance
    pub balance_cents: i64,

    /// "active" or "blocked"
    pub status: String,

    /// At most one true per wallet
    pub is_default: bool,

    /// Timestamp when the card was issued
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Last four digits of the card number, as recorded on transactions.
    pub fn last4(&self) -> String {
        let digits = self.card_number.len();
        self.card_number[digits.saturating_sub(4)..].to_string()
    }

    /// Whether this card is frozen.
    pub fn is_blocked(&self) -> bool {
        self.status == STATUS_BLOCKED
    }
}

/// Request body for issuing a new card.
///
/// # JSON Example
///
/// ```json
/// {
///   "card_holder_name": "Ada Obi",
///   "card_tier": "GOLD"
/// }
/// ```
///
/// # Validation
///
/// - `card_holder_name`: required, must be non-empty
/// - `card_tier`: optional, defaults to "PLATINUM"
#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub card_holder_name: String,

    #[serde(default = "default_tier")]
    pub card_tier: String,
}

/// Default tier when the request does not specify one.
fn default_tier() -> String {
    "PLATINUM".to_string()
}

/// Response body for card endpoints.
///
/// # Security Note
///
/// The `cvv` field is ONLY included when issuing a new card. It is never
/// returned by list or lifecycle operations.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub card_number: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,

    pub expiry_date: DateTime<Utc>,
    pub card_holder_name: String,
    pub card_type: String,
    pub card_tier: String,
    pub network: String,
    pub balance_cents: i64,
    pub status: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            card_number: card.card_number,
            cvv: None, // Never include the CVV by default
            expiry_date: card.expiry_date,
            card_holder_name: card.card_holder_name,
            card_type: card.card_type,
            card_tier: card.card_tier,
            network: card.network,
            balance_cents: card.balance_cents,
            status: card.status,
            is_default: card.is_default,
            created_at: card.created_at,
        }
    }
}

impl CardResponse {
    /// Attach the CVV (only for the creation response).
    pub fn with_cvv(mut self, cvv: String) -> Self {
        self.cvv = Some(cvv);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card() -> Card {
        Card {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            card_number: "4123456789015678".to_string(),
            cvv: "123".to_string(),
            expiry_date: Utc::now(),
            card_holder_name: "Ada Obi".to_string(),
            card_type: "DEBIT".to_string(),
            card_tier: "PLATINUM".to_string(),
            network: "VISA".to_string(),
            balance_cents: 0,
            status: STATUS_ACTIVE.to_string(),
            is_default: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn last4_takes_trailing_digits() {
        assert_eq!(sample_card().last4(), "5678");
    }

    #[test]
    fn response_omits_cvv_unless_attached() {
        let response = CardResponse::from(sample_card());
        assert!(response.cvv.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("cvv").is_none());

        let with_cvv = CardResponse::from(sample_card()).with_cvv("123".to_string());
        assert_eq!(with_cvv.cvv.as_deref(), Some("123"));
    }
}

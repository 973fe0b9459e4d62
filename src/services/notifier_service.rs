//! Notifier service - post-commit event fan-out.
//!
//! The ledger engine hands committed-transaction events to this module on a
//! spawned task. Each event becomes an in-app notification row and, when a
//! gateway is configured, a signed HTTP POST to the external notifier
//! gateway, which owns email/push fan-out.
//!
//! # Error Handling
//!
//! Delivery runs entirely off the request path. Every failure is logged and
//! swallowed; a committed transaction never appears failed because a
//! notification could not be delivered.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        notification::{
            GatewayPayload, KIND_DEPOSIT, KIND_TRANSFER_RECEIVED, KIND_TRANSFER_SENT,
            KIND_WITHDRAW, Notification, NotificationEvent,
        },
        transaction::Transaction,
    },
};

type HmacSha256 = Hmac<Sha256>;

/// Notifier gateway settings, carried in the shared application state.
#[derive(Debug, Clone, Default)]
pub struct NotifierSettings {
    /// Gateway endpoint; `None` keeps delivery in-app only
    pub url: Option<String>,

    /// HMAC secret for the `X-Notifier-Signature` header
    pub secret: Option<String>,
}

/// Deliver a batch of events without blocking the caller.
///
/// Fire-and-forget: the spawned task owns delivery, and the financial
/// operation that produced the events has already committed.
pub fn spawn_notify(pool: DbPool, settings: NotifierSettings, events: Vec<NotificationEvent>) {
    tokio::spawn(async move {
        for event in events {
            if let Err(err) = deliver(&pool, &settings, &event).await {
                tracing::error!(
                    user_id = %event.user_id,
                    kind = %event.kind,
                    "failed to deliver notification: {:?}",
                    err
                );
            }
        }
    });
}

/// Deliver one event to the in-app feed and the gateway.
async fn deliver(
    pool: &DbPool,
    settings: &NotifierSettings,
    event: &NotificationEvent,
) -> Result<(), AppError> {
    insert_in_app(pool, event).await?;

    if let Some(ref url) = settings.url {
        send_to_gateway(url, settings.secret.as_deref(), event).await?;
    }

    Ok(())
}

/// Insert the in-app notification row.
async fn insert_in_app(pool: &DbPool, event: &NotificationEvent) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO notifications (
            user_id,
            kind,
            title,
            body,
            amount_cents,
            reference,
            card_last4
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.user_id)
    .bind(&event.kind)
    .bind(&event.title)
    .bind(&event.message)
    .bind(event.amount_cents)
    .bind(&event.reference)
    .bind(&event.card_last4)
    .execute(pool)
    .await?;

    Ok(())
}

/// POST one signed event payload to the notifier gateway.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Notifier-Signature: sha256=<hex>` (when a secret is configured)
/// - `X-Notifier-Event-Id: <uuid>`
///
/// # Timeout
///
/// 5 seconds per delivery (prevents hanging on a slow gateway)
async fn send_to_gateway(
    url: &str,
    secret: Option<&str>,
    event: &NotificationEvent,
) -> Result<(), AppError> {
    let payload = GatewayPayload::new(event.clone());
    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to serialize payload: {}", e)))?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| AppError::InvalidRequest(format!("HTTP client error: {}", e)))?;

    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("X-Notifier-Event-Id", payload.event_id.to_string());
    if let Some(secret) = secret {
        request = request.header(
            "X-Notifier-Signature",
            generate_signature(secret, &payload_json),
        );
    }

    match request.body(payload_json).send().await {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => {
            tracing::warn!(
                status = %response.status(),
                kind = %payload.event.kind,
                "notifier gateway rejected event"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!("notifier gateway request failed: {}", err);
            Ok(())
        }
    }
}

/// Generate the HMAC-SHA256 signature for a gateway payload.
///
/// Format: `sha256=<hex_encoded_hmac>`. The gateway recomputes
/// HMAC-SHA256(secret, body) and compares in constant time.
fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}

/// Render an amount in major units, e.g. `NGN 250.00`.
fn format_amount(currency: &str, amount_cents: i64) -> String {
    format!("{} {}.{:02}", currency, amount_cents / 100, amount_cents % 100)
}

/// Event for a credited deposit.
pub fn deposit_event(user_id: Uuid, currency: &str, tx: &Transaction) -> NotificationEvent {
    NotificationEvent {
        user_id,
        kind: KIND_DEPOSIT.to_string(),
        title: "Deposit successful".to_string(),
        message: format!(
            "Your wallet was credited with {} ({})",
            format_amount(currency, tx.amount_cents),
            tx.reference
        ),
        amount_cents: tx.amount_cents,
        reference: tx.reference.clone(),
        card_last4: tx.card_last4.clone(),
    }
}

/// Event for a debited withdrawal.
pub fn withdraw_event(user_id: Uuid, currency: &str, tx: &Transaction) -> NotificationEvent {
    NotificationEvent {
        user_id,
        kind: KIND_WITHDRAW.to_string(),
        title: "Withdrawal successful".to_string(),
        message: format!(
            "You withdrew {} ({})",
            format_amount(currency, tx.amount_cents),
            tx.reference
        ),
        amount_cents: tx.amount_cents,
        reference: tx.reference.clone(),
        card_last4: tx.card_last4.clone(),
    }
}

/// Event for the sending side of a transfer.
pub fn transfer_sent_event(
    user_id: Uuid,
    currency: &str,
    receiver_account: &str,
    tx: &Transaction,
) -> NotificationEvent {
    NotificationEvent {
        user_id,
        kind: KIND_TRANSFER_SENT.to_string(),
        title: "Transfer sent".to_string(),
        message: format!(
            "You sent {} to account {} ({})",
            format_amount(currency, tx.amount_cents),
            receiver_account,
            tx.reference
        ),
        amount_cents: tx.amount_cents,
        reference: tx.reference.clone(),
        card_last4: tx.card_last4.clone(),
    }
}

/// Event for the receiving side of a transfer.
pub fn transfer_received_event(
    user_id: Uuid,
    currency: &str,
    card_last4: Option<String>,
    tx: &Transaction,
) -> NotificationEvent {
    NotificationEvent {
        user_id,
        kind: KIND_TRANSFER_RECEIVED.to_string(),
        title: "Money received".to_string(),
        message: format!(
            "You received {} ({})",
            format_amount(currency, tx.amount_cents),
            tx.reference
        ),
        amount_cents: tx.amount_cents,
        reference: tx.reference.clone(),
        card_last4,
    }
}

/// List a user's in-app notifications, newest first.
pub async fn list_notifications(
    pool: &DbPool,
    user_id: Uuid,
) -> Result<Vec<Notification>, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark one of the caller's notifications as read.
pub async fn mark_read(
    pool: &DbPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET is_read = TRUE
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotificationNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_tx() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            reference: "TRF-1A2B3C4D".to_string(),
            transaction_type: "TRANSFER".to_string(),
            status: "COMPLETED".to_string(),
            sender_id: Some(Uuid::new_v4()),
            receiver_id: Some(Uuid::new_v4()),
            card_id: None,
            card_last4: Some("5678".to_string()),
            amount_cents: 25_000,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn amounts_render_in_major_units() {
        assert_eq!(format_amount("NGN", 25_000), "NGN 250.00");
        assert_eq!(format_amount("NGN", 5), "NGN 0.05");
        assert_eq!(format_amount("USD", 100), "USD 1.00");
    }

    #[test]
    fn transfer_events_carry_both_kinds() {
        let tx = sample_tx();
        let sent = transfer_sent_event(Uuid::new_v4(), "NGN", "0123456789", &tx);
        let received = transfer_received_event(Uuid::new_v4(), "NGN", None, &tx);

        assert_eq!(sent.kind, KIND_TRANSFER_SENT);
        assert_eq!(received.kind, KIND_TRANSFER_RECEIVED);
        assert!(sent.message.contains("0123456789"));
        assert!(received.card_last4.is_none());
    }

    #[test]
    fn signatures_are_prefixed_hex() {
        let signature = generate_signature("secret", "{\"event\":1}");
        let hex_part = signature.strip_prefix("sha256=").unwrap();
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}

//! Card service - issuance, lifecycle, and default-card resolution.
//!
//! Cards are virtual debit instruments tied to a wallet. The helpers that
//! take `&mut PgConnection` run inside the ledger engine's atomic write
//! scope; the entry points that take a pool wrap themselves in one.
//!
//! # Default-card resolution
//!
//! `ensure_default_card` is the single, idempotent operation every flow that
//! needs a default goes through: it returns the default card, promotes the
//! oldest card when no default exists, or synthesizes a fresh PLATINUM card
//! for legacy wallets with no cards at all. Flows call it explicitly at the
//! point they need the card; nothing promotes defaults as a hidden side
//! effect of unrelated reads.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    models::{
        card::{Card, CreateCardRequest, STATUS_ACTIVE, STATUS_BLOCKED},
        wallet::Wallet,
    },
    services::wallet_service,
};

/// Generate a candidate 16-digit card number.
///
/// The leading digit picks the network: 4 for VISA, 5 for MASTERCARD.
pub fn random_card_number() -> String {
    let mut digits = String::with_capacity(16);
    digits.push(if rand::random::<bool>() { '4' } else { '5' });
    for _ in 0..15 {
        digits.push(char::from(b'0' + rand::random_range(0..10u8)));
    }
    digits
}

/// Card network implied by a card number's leading digit.
pub fn network_for(card_number: &str) -> &'static str {
    match card_number.as_bytes().first() {
        Some(b'4') => "VISA",
        Some(b'5') => "MASTERCARD",
        _ => "VERVE",
    }
}

/// Generate a 3-digit CVV.
pub fn random_cvv() -> String {
    format!("{:03}", rand::random_range(0u16..1000))
}

/// Insert a new card for a wallet.
///
/// Generates a unique 16-digit number, a CVV, and a 5-year expiry. The CVV
/// is only ever readable from the returned record; API responses never
/// include it after creation.
pub async fn issue_card(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    holder_name: &str,
    tier: &str,
    make_default: bool,
) -> Result<Card, AppError> {
    let card_number = allocate_card_number(&mut *conn).await?;
    let network = network_for(&card_number);
    let expiry = chrono::Utc::now() + chrono::Months::new(60);

    let card = sqlx::query_as::<_, Card>(
        r#"
        INSERT INTO cards (
            wallet_id,
            card_number,
            cvv,
            expiry_date,
            card_holder_name,
            card_tier,
            network,
            is_default
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(&card_number)
    .bind(random_cvv())
    .bind(expiry)
    .bind(holder_name)
    .bind(tier)
    .bind(network)
    .bind(make_default)
    .fetch_one(&mut *conn)
    .await?;

    Ok(card)
}

/// Pick a card number not yet present in the store.
async fn allocate_card_number(conn: &mut PgConnection) -> Result<String, AppError> {
    for _ in 0..5 {
        let candidate = random_card_number();
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE card_number = $1)")
                .bind(&candidate)
                .fetch_one(&mut *conn)
                .await?;
        if !taken {
            return Ok(candidate);
        }
    }

    Err(AppError::InvalidRequest(
        "Could not allocate a card number".to_string(),
    ))
}

/// Resolve the card that receives a credit when none is chosen explicitly.
///
/// Idempotent: returns the wallet's default card if one exists; otherwise
/// promotes the oldest card to default and returns it; for a wallet with no
/// cards at all (legacy data) synthesizes a new default PLATINUM debit card.
///
/// Must run inside the operation's atomic write scope; the candidate row is
/// locked so a concurrent promotion cannot race.
pub async fn ensure_default_card(
    conn: &mut PgConnection,
    wallet: &Wallet,
) -> Result<Card, AppError> {
    let candidate = sqlx::query_as::<_, Card>(
        r#"
        SELECT * FROM cards
        WHERE wallet_id = $1
        ORDER BY is_default DESC, created_at ASC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(wallet.id)
    .fetch_optional(&mut *conn)
    .await?;

    match candidate {
        Some(card) if card.is_default => Ok(card),
        Some(card) => {
            // Oldest card exists but no default; promote it. The ordering
            // guarantees no other default exists, so the partial unique
            // index cannot be violated.
            let promoted = sqlx::query_as::<_, Card>(
                "UPDATE cards SET is_default = TRUE WHERE id = $1 RETURNING *",
            )
            .bind(card.id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(promoted)
        }
        None => {
            let holder_name: String = sqlx::query_scalar("SELECT full_name FROM users WHERE id = $1")
                .bind(wallet.user_id)
                .fetch_one(&mut *conn)
                .await?;
            issue_card(&mut *conn, wallet.id, &holder_name, "PLATINUM", true).await
        }
    }
}

/// Find the card a transfer receiver should be credited on, if any.
///
/// Prefers the default card, falling back to the oldest. Unlike
/// [`ensure_default_card`] this never mutates: a cardless receiver is
/// tolerated and the wallet-side credit stands alone.
pub async fn find_credit_card(
    conn: &mut PgConnection,
    wallet_id: Uuid,
) -> Result<Option<Card>, AppError> {
    let card = sqlx::query_as::<_, Card>(
        r#"
        SELECT * FROM cards
        WHERE wallet_id = $1
        ORDER BY is_default DESC, created_at ASC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(wallet_id)
    .fetch_optional(conn)
    .await?;

    Ok(card)
}

/// Fetch and lock one card, verifying it belongs to the wallet.
pub async fn fetch_wallet_card(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    card_id: Uuid,
) -> Result<Option<Card>, AppError> {
    let card =
        sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 AND wallet_id = $2 FOR UPDATE")
            .bind(card_id)
            .bind(wallet_id)
            .fetch_optional(conn)
            .await?;

    Ok(card)
}

/// Fetch and lock all of a wallet's cards in allocation order.
pub async fn fetch_cards_for_update(
    conn: &mut PgConnection,
    wallet_id: Uuid,
) -> Result<Vec<Card>, AppError> {
    let cards = sqlx::query_as::<_, Card>(
        r#"
        SELECT * FROM cards
        WHERE wallet_id = $1
        ORDER BY is_default DESC, created_at ASC
        FOR UPDATE
        "#,
    )
    .bind(wallet_id)
    .fetch_all(conn)
    .await?;

    Ok(cards)
}

/// Add to a card balance.
pub async fn credit_card(
    conn: &mut PgConnection,
    card_id: Uuid,
    amount_cents: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE cards SET balance_cents = balance_cents + $1 WHERE id = $2")
        .bind(amount_cents)
        .bind(card_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Subtract from a card balance.
pub async fn debit_card(
    conn: &mut PgConnection,
    card_id: Uuid,
    amount_cents: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE cards SET balance_cents = balance_cents - $1 WHERE id = $2")
        .bind(amount_cents)
        .bind(card_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Issue an additional card for the caller's wallet.
///
/// # Validation
///
/// - Holder name must be non-empty
/// - The caller must have a wallet
///
/// The wallet's first card becomes its default.
pub async fn create_card(
    pool: &DbPool,
    user_id: Uuid,
    request: CreateCardRequest,
) -> Result<Card, AppError> {
    let holder_name = request.card_holder_name.trim().to_string();
    if holder_name.is_empty() {
        return Err(AppError::InvalidRequest(
            "Card holder name is required".to_string(),
        ));
    }
    let tier = request.card_tier.trim().to_uppercase();

    db::with_atomic_write(pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let wallet = wallet_service::fetch_wallet_for_update(&mut *conn, user_id)
                .await?
                .ok_or(AppError::WalletNotFound)?;

            let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE wallet_id = $1")
                .bind(wallet.id)
                .fetch_one(&mut *conn)
                .await?;

            issue_card(&mut *conn, wallet.id, &holder_name, &tier, existing == 0).await
        })
    })
    .await
}

/// List the caller's cards, oldest first.
///
/// For a wallet with exactly one card the card's balance is presented as a
/// mirror of the wallet balance. The mirrored value is derived here at read
/// time and never written back.
pub async fn list_cards(pool: &DbPool, user_id: Uuid) -> Result<Vec<Card>, AppError> {
    let wallet = wallet_service::get_wallet(pool, user_id).await?;

    let mut cards = sqlx::query_as::<_, Card>(
        "SELECT * FROM cards WHERE wallet_id = $1 ORDER BY created_at ASC",
    )
    .bind(wallet.id)
    .fetch_all(pool)
    .await?;

    if let [card] = cards.as_mut_slice() {
        card.balance_cents = wallet.balance_cents;
    }

    Ok(cards)
}

/// Freeze a card. Blocked cards reject explicit debits and are skipped by
/// auto-split; balances are untouched.
pub async fn freeze_card(pool: &DbPool, user_id: Uuid, card_id: Uuid) -> Result<Card, AppError> {
    set_card_status(pool, user_id, card_id, STATUS_BLOCKED).await
}

/// Unfreeze a card.
pub async fn unfreeze_card(pool: &DbPool, user_id: Uuid, card_id: Uuid) -> Result<Card, AppError> {
    set_card_status(pool, user_id, card_id, STATUS_ACTIVE).await
}

async fn set_card_status(
    pool: &DbPool,
    user_id: Uuid,
    card_id: Uuid,
    status: &str,
) -> Result<Card, AppError> {
    sqlx::query_as::<_, Card>(
        r#"
        UPDATE cards
        SET status = $1
        WHERE id = $2
          AND wallet_id = (SELECT id FROM wallets WHERE user_id = $3)
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::CardNotFound)
}

/// Delete a card.
///
/// # Rules
///
/// - The wallet's last remaining card cannot be deleted
/// - A card still holding a balance cannot be deleted
/// - Deleting the default card promotes the oldest survivor to default
pub async fn delete_card(pool: &DbPool, user_id: Uuid, card_id: Uuid) -> Result<(), AppError> {
    db::with_atomic_write(pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let wallet = wallet_service::fetch_wallet_for_update(&mut *conn, user_id)
                .await?
                .ok_or(AppError::WalletNotFound)?;

            let cards = fetch_cards_for_update(&mut *conn, wallet.id).await?;
            let target = cards
                .iter()
                .find(|card| card.id == card_id)
                .ok_or(AppError::CardNotFound)?;

            if cards.len() == 1 {
                return Err(AppError::LastCard);
            }
            if target.balance_cents != 0 {
                return Err(AppError::CardHasBalance);
            }

            sqlx::query("DELETE FROM cards WHERE id = $1")
                .bind(target.id)
                .execute(&mut *conn)
                .await?;

            if target.is_default {
                // Promote the oldest survivor; the old default row is gone,
                // so the partial unique index stays satisfied.
                let heir = cards
                    .iter()
                    .filter(|card| card.id != card_id)
                    .min_by_key(|card| card.created_at);
                if let Some(heir) = heir {
                    sqlx::query("UPDATE cards SET is_default = TRUE WHERE id = $1")
                        .bind(heir.id)
                        .execute(&mut *conn)
                        .await?;
                }
            }

            Ok(())
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn card_numbers_are_sixteen_digits() {
        for _ in 0..100 {
            let number = random_card_number();
            assert_eq!(number.len(), 16);
            assert!(number.bytes().all(|b| b.is_ascii_digit()));
            assert!(matches!(number.as_bytes()[0], b'4' | b'5'));
        }
    }

    #[rstest]
    #[case("4111111111111111", "VISA")]
    #[case("5500000000000004", "MASTERCARD")]
    #[case("5061020000000000", "MASTERCARD")]
    #[case("6280000000000000", "VERVE")]
    fn network_follows_leading_digit(#[case] number: &str, #[case] expected: &str) {
        assert_eq!(network_for(number), expected);
    }

    #[test]
    fn cvv_is_three_digits() {
        for _ in 0..100 {
            let cvv = random_cvv();
            assert_eq!(cvv.len(), 3);
            assert!(cvv.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}

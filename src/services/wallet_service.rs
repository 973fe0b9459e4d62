//! Wallet service - wallet creation and balance row access.
//!
//! Wallets are created exactly once at registration and their balances are
//! mutated only by the ledger engine. Every mutating helper here takes a
//! `&mut PgConnection` so it can only run inside an atomic write scope; the
//! engine locks the wallet row with `FOR UPDATE` before touching balances,
//! which serializes concurrent debits against the same wallet.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::wallet::Wallet};

/// Generate a candidate 10-digit account number.
pub fn random_account_number() -> String {
    format!("{:010}", rand::random_range(0u64..10_000_000_000))
}

/// Open a wallet for a freshly registered user.
///
/// Allocates a unique account number and inserts the wallet with a zero
/// balance. Runs inside the registration's atomic write scope.
pub async fn open_wallet(conn: &mut PgConnection, user_id: Uuid) -> Result<Wallet, AppError> {
    let account_number = allocate_account_number(&mut *conn).await?;

    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (user_id, account_number)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&account_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(wallet)
}

/// Pick an account number not yet present in the store.
///
/// The 10-digit space makes collisions rare; the unique index on
/// `account_number` is the backstop if one slips through between the check
/// and the insert.
async fn allocate_account_number(conn: &mut PgConnection) -> Result<String, AppError> {
    for _ in 0..5 {
        let candidate = random_account_number();
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM wallets WHERE account_number = $1)")
                .bind(&candidate)
                .fetch_one(&mut *conn)
                .await?;
        if !taken {
            return Ok(candidate);
        }
    }

    Err(AppError::InvalidRequest(
        "Could not allocate an account number".to_string(),
    ))
}

/// Fetch the caller's wallet (read-only, no lock).
pub async fn get_wallet(pool: &DbPool, user_id: Uuid) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::WalletNotFound)
}

/// Fetch and lock a wallet by owner.
///
/// `FOR UPDATE` holds the row until the surrounding transaction commits, so
/// two concurrent debits against the same wallet serialize here and the
/// second sees the post-debit balance.
pub async fn fetch_wallet_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Wallet>, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(wallet)
}

/// Fetch and lock a wallet by account number (transfer receiver lookup).
pub async fn fetch_wallet_by_account_for_update(
    conn: &mut PgConnection,
    account_number: &str,
) -> Result<Option<Wallet>, AppError> {
    let wallet =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE account_number = $1 FOR UPDATE")
            .bind(account_number)
            .fetch_optional(conn)
            .await?;

    Ok(wallet)
}

/// Add to a wallet balance.
pub async fn credit_wallet(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount_cents: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET balance_cents = balance_cents + $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(amount_cents)
    .bind(wallet_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Subtract from a wallet balance.
///
/// Callers verify sufficiency under the row lock first; the database CHECK
/// constraint rejects any write that would go negative anyway.
pub async fn debit_wallet(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount_cents: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET balance_cents = balance_cents - $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(amount_cents)
    .bind(wallet_id)
    .execute(conn)
    .await?;

    Ok(())
}

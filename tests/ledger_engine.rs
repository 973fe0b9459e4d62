//! Integration tests for the ledger engine against PostgreSQL.
//!
//! These tests exercise deposit/withdraw/transfer end to end, including the
//! atomicity and lost-update guarantees that only hold with a real store.
//! They are `#[ignore]`d so `cargo test` passes without a database; run them
//! with a Postgres instance available:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/pocketbank_test cargo test -- --ignored
//! ```

use sqlx::PgConnection;
use uuid::Uuid;

use pocketbank::{
    AppState,
    db::{self, DbPool},
    error::AppError,
    models::{
        card::Card,
        transaction::{DepositRequest, TransferRequest, WithdrawRequest},
        user::User,
        wallet::Wallet,
    },
    services::{card_service, ledger_service, notifier_service::NotifierSettings, wallet_service},
};

async fn test_state() -> AppState {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ledger tests");
    let pool = db::create_pool(&database_url)
        .await
        .expect("failed to connect to test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    AppState {
        pool,
        notifier: NotifierSettings::default(),
    }
}

/// Create a user with a wallet and one default card (the registration
/// shape).
async fn user_with_card(state: &AppState) -> (User, Wallet, Card) {
    let user = insert_user(&state.pool).await;
    let user_id = user.id;

    let (wallet, card) = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let wallet = wallet_service::open_wallet(&mut *conn, user_id).await?;
            let card =
                card_service::issue_card(&mut *conn, wallet.id, "Test Holder", "PLATINUM", true)
                    .await?;
            Ok((wallet, card))
        })
    })
    .await
    .expect("failed to seed user");

    (user, wallet, card)
}

/// Create a user whose wallet has no cards (legacy data shape).
async fn user_without_card(state: &AppState) -> (User, Wallet) {
    let user = insert_user(&state.pool).await;
    let user_id = user.id;

    let wallet = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move { wallet_service::open_wallet(&mut *conn, user_id).await })
    })
    .await
    .expect("failed to seed cardless user");

    (user, wallet)
}

async fn insert_user(pool: &DbPool) -> User {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, full_name) VALUES ($1, 'Test Holder') RETURNING *",
    )
    .bind(format!("user-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("failed to insert user")
}

async fn deposit(state: &AppState, user_id: Uuid, amount_cents: i64) {
    ledger_service::deposit(
        state,
        user_id,
        DepositRequest {
            amount_cents,
            description: None,
            card_id: None,
        },
    )
    .await
    .expect("deposit failed");
}

fn withdraw_request(amount_cents: i64, card_id: Option<Uuid>) -> WithdrawRequest {
    WithdrawRequest {
        amount_cents,
        description: None,
        card_id,
    }
}

fn transfer_request(account_number: &str, amount_cents: i64) -> TransferRequest {
    TransferRequest {
        receiver_account_number: account_number.to_string(),
        amount_cents,
        description: None,
        card_id: None,
    }
}

async fn wallet_balance(pool: &DbPool, wallet_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT balance_cents FROM wallets WHERE id = $1")
        .bind(wallet_id)
        .fetch_one(pool)
        .await
        .expect("wallet missing")
}

async fn card_balance(pool: &DbPool, card_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT balance_cents FROM cards WHERE id = $1")
        .bind(card_id)
        .fetch_one(pool)
        .await
        .expect("card missing")
}

async fn cards_of(pool: &DbPool, wallet_id: Uuid) -> Vec<Card> {
    sqlx::query_as("SELECT * FROM cards WHERE wallet_id = $1 ORDER BY created_at ASC")
        .bind(wallet_id)
        .fetch_all(pool)
        .await
        .expect("failed to list cards")
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn withdraw_debits_wallet_and_single_card_together() {
    let state = test_state().await;
    let (user, wallet, card) = user_with_card(&state).await;
    deposit(&state, user.id, 10_000).await;

    let tx = ledger_service::withdraw(&state, user.id, withdraw_request(3_000, None))
        .await
        .expect("withdraw failed");

    assert_eq!(tx.transaction_type, "WITHDRAW");
    assert_eq!(tx.status, "COMPLETED");
    assert_eq!(tx.amount_cents, 3_000);
    assert_eq!(tx.card_id, Some(card.id));
    assert!(tx.reference.starts_with("WDL-"));

    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 7_000);
    assert_eq!(card_balance(&state.pool, card.id).await, 7_000);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn auto_split_drains_default_card_first() {
    let state = test_state().await;
    let (user, wallet, card_a) = user_with_card(&state).await;

    // Seed [A: 2000, default] and [B: 5000] directly so the split is exact.
    let card_b = card_service::create_card(
        &state.pool,
        user.id,
        pocketbank::models::card::CreateCardRequest {
            card_holder_name: "Test Holder".to_string(),
            card_tier: "GOLD".to_string(),
        },
    )
    .await
    .expect("failed to add card");
    sqlx::query("UPDATE wallets SET balance_cents = 7000 WHERE id = $1")
        .bind(wallet.id)
        .execute(&state.pool)
        .await
        .unwrap();
    sqlx::query("UPDATE cards SET balance_cents = 2000 WHERE id = $1")
        .bind(card_a.id)
        .execute(&state.pool)
        .await
        .unwrap();
    sqlx::query("UPDATE cards SET balance_cents = 5000 WHERE id = $1")
        .bind(card_b.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let tx = ledger_service::withdraw(&state, user.id, withdraw_request(3_000, None))
        .await
        .expect("withdraw failed");

    // A drained to 0, B contributes the remaining 1000; A is the recorded card.
    assert_eq!(tx.card_id, Some(card_a.id));
    assert_eq!(card_balance(&state.pool, card_a.id).await, 0);
    assert_eq!(card_balance(&state.pool, card_b.id).await, 4_000);

    // Multi-card invariant: wallet balance equals the sum of card balances.
    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 4_000);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn concurrent_full_withdrawals_have_exactly_one_winner() {
    let state = test_state().await;
    let (user, wallet, _card) = user_with_card(&state).await;
    deposit(&state, user.id, 5_000).await;

    let (first, second) = tokio::join!(
        ledger_service::withdraw(&state, user.id, withdraw_request(5_000, None)),
        ledger_service::withdraw(&state, user.id, withdraw_request(5_000, None)),
    );

    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one concurrent withdrawal must win");
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(AppError::InsufficientFunds)
    )));

    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn self_transfer_is_rejected_without_balance_change() {
    let state = test_state().await;
    let (user, wallet, _card) = user_with_card(&state).await;
    deposit(&state, user.id, 1_000).await;

    let result = ledger_service::transfer(
        &state,
        user.id,
        transfer_request(&wallet.account_number, 100),
    )
    .await;

    assert!(matches!(result, Err(AppError::SelfTransfer)));
    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 1_000);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn transfer_moves_wallet_and_card_balances() {
    let state = test_state().await;
    let (sender, sender_wallet, sender_card) = user_with_card(&state).await;
    let (receiver, receiver_wallet, receiver_card) = user_with_card(&state).await;
    deposit(&state, sender.id, 10_000).await;

    let tx = ledger_service::transfer(
        &state,
        sender.id,
        transfer_request(&receiver_wallet.account_number, 2_500),
    )
    .await
    .expect("transfer failed");

    assert_eq!(tx.transaction_type, "TRANSFER");
    assert_eq!(tx.sender_id, Some(sender.id));
    assert_eq!(tx.receiver_id, Some(receiver.id));
    assert!(tx.reference.starts_with("TRF-"));

    assert_eq!(wallet_balance(&state.pool, sender_wallet.id).await, 7_500);
    assert_eq!(card_balance(&state.pool, sender_card.id).await, 7_500);
    assert_eq!(wallet_balance(&state.pool, receiver_wallet.id).await, 2_500);
    assert_eq!(card_balance(&state.pool, receiver_card.id).await, 2_500);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn transfer_above_ceiling_is_rejected_before_any_write() {
    let state = test_state().await;
    let (sender, sender_wallet, _card) = user_with_card(&state).await;
    let (_receiver, receiver_wallet, _receiver_card) = user_with_card(&state).await;
    deposit(&state, sender.id, 1_000).await;

    let result = ledger_service::transfer(
        &state,
        sender.id,
        transfer_request(&receiver_wallet.account_number, 1_000_000_001),
    )
    .await;

    assert!(matches!(result, Err(AppError::LimitExceeded)));
    assert_eq!(wallet_balance(&state.pool, sender_wallet.id).await, 1_000);
    assert_eq!(wallet_balance(&state.pool, receiver_wallet.id).await, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn transfer_to_unknown_account_fails() {
    let state = test_state().await;
    let (sender, _wallet, _card) = user_with_card(&state).await;
    deposit(&state, sender.id, 1_000).await;

    let result = ledger_service::transfer(
        &state,
        sender.id,
        transfer_request("no-such-account", 100),
    )
    .await;

    assert!(matches!(result, Err(AppError::RecipientNotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn transfer_tolerates_cardless_receiver() {
    let state = test_state().await;
    let (sender, _sender_wallet, _card) = user_with_card(&state).await;
    let (_receiver, receiver_wallet) = user_without_card(&state).await;
    deposit(&state, sender.id, 3_000).await;

    ledger_service::transfer(
        &state,
        sender.id,
        transfer_request(&receiver_wallet.account_number, 1_000),
    )
    .await
    .expect("transfer failed");

    // Wallet-side credit stands alone; no card is synthesized for the receiver.
    assert_eq!(wallet_balance(&state.pool, receiver_wallet.id).await, 1_000);
    assert!(cards_of(&state.pool, receiver_wallet.id).await.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn deposit_synthesizes_default_card_for_cardless_wallet() {
    let state = test_state().await;
    let (user, wallet) = user_without_card(&state).await;

    let tx = ledger_service::deposit(
        &state,
        user.id,
        DepositRequest {
            amount_cents: 1_000,
            description: None,
            card_id: None,
        },
    )
    .await
    .expect("deposit failed");

    let cards = cards_of(&state.pool, wallet.id).await;
    assert_eq!(cards.len(), 1);
    assert!(cards[0].is_default);
    assert_eq!(cards[0].card_tier, "PLATINUM");
    assert_eq!(cards[0].balance_cents, 1_000);
    assert_eq!(tx.card_id, Some(cards[0].id));
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn explicit_card_failures_roll_back_the_wallet_debit() {
    let state = test_state().await;
    let (user, wallet, card) = user_with_card(&state).await;
    deposit(&state, user.id, 5_000).await;

    // Frozen card rejects the debit and the wallet debit rolls back with it.
    card_service::freeze_card(&state.pool, user.id, card.id)
        .await
        .expect("freeze failed");
    let frozen = ledger_service::withdraw(&state, user.id, withdraw_request(1_000, Some(card.id)))
        .await;
    assert!(matches!(frozen, Err(AppError::CardFrozen)));
    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 5_000);

    card_service::unfreeze_card(&state.pool, user.id, card.id)
        .await
        .expect("unfreeze failed");

    // A card that cannot cover the whole amount fails the same way.
    let second = card_service::create_card(
        &state.pool,
        user.id,
        pocketbank::models::card::CreateCardRequest {
            card_holder_name: "Test Holder".to_string(),
            card_tier: "PLATINUM".to_string(),
        },
    )
    .await
    .expect("failed to add card");
    let short = ledger_service::withdraw(&state, user.id, withdraw_request(1_000, Some(second.id)))
        .await;
    assert!(matches!(short, Err(AppError::InsufficientCardFunds)));
    assert_eq!(wallet_balance(&state.pool, wallet.id).await, 5_000);
    assert_eq!(card_balance(&state.pool, card.id).await, 5_000);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn history_is_newest_first_and_stable_across_reads() {
    let state = test_state().await;
    let (user, _wallet, _card) = user_with_card(&state).await;
    deposit(&state, user.id, 4_000).await;
    ledger_service::withdraw(&state, user.id, withdraw_request(1_000, None))
        .await
        .expect("withdraw failed");

    let first = ledger_service::history(&state.pool, user.id)
        .await
        .expect("history failed");
    let second = ledger_service::history(&state.pool, user.id)
        .await
        .expect("history failed");

    assert_eq!(first.len(), 2);
    assert!(first[0].created_at >= first[1].created_at);
    let first_ids: Vec<Uuid> = first.iter().map(|tx| tx.id).collect();
    let second_ids: Vec<Uuid> = second.iter().map(|tx| tx.id).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn card_deletion_rules_hold() {
    let state = test_state().await;
    let (user, _wallet, card) = user_with_card(&state).await;

    // Sole card cannot be deleted.
    let last = card_service::delete_card(&state.pool, user.id, card.id).await;
    assert!(matches!(last, Err(AppError::LastCard)));

    // A funded card cannot be deleted either.
    deposit(&state, user.id, 1_000).await;
    let second = card_service::create_card(
        &state.pool,
        user.id,
        pocketbank::models::card::CreateCardRequest {
            card_holder_name: "Test Holder".to_string(),
            card_tier: "PLATINUM".to_string(),
        },
    )
    .await
    .expect("failed to add card");
    let funded = card_service::delete_card(&state.pool, user.id, card.id).await;
    assert!(matches!(funded, Err(AppError::CardHasBalance)));

    // Drain the default card, delete it, and the survivor is promoted.
    ledger_service::withdraw(&state, user.id, withdraw_request(1_000, Some(card.id)))
        .await
        .expect("withdraw failed");
    card_service::delete_card(&state.pool, user.id, card.id)
        .await
        .expect("delete failed");

    let survivor = card_service::list_cards(&state.pool, user.id)
        .await
        .expect("list failed");
    assert_eq!(survivor.len(), 1);
    assert_eq!(survivor[0].id, second.id);
    assert!(survivor[0].is_default);
}

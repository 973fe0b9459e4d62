//! Ledger service - the money-moving core.
//!
//! This service orchestrates deposit, withdraw, and transfer as atomic
//! units: validate preconditions, mutate wallet and card balances through
//! the allocator, append the transaction record, and hand post-commit
//! events to the notifier. Every entry point wraps its full write set in
//! [`crate::db::with_atomic_write`], so a failure anywhere between the
//! first balance write and the log insert rolls the whole operation back;
//! no partial state is ever visible.
//!
//! # Concurrency
//!
//! Wallet rows are locked with `SELECT ... FOR UPDATE` before balances are
//! read, so two concurrent withdrawals against the same wallet serialize:
//! the second re-reads the post-debit balance inside its own transaction
//! and fails with `InsufficientFunds` instead of double-spending. No
//! retries are performed; a failed write surfaces directly to the caller.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    AppState, db,
    error::AppError,
    models::{
        transaction::{DepositRequest, Transaction, TransferRequest, WithdrawRequest},
        wallet::Wallet,
    },
    services::{allocator, card_service, notifier_service, wallet_service},
};

/// Transaction type recorded for deposits.
pub const TYPE_DEPOSIT: &str = "DEPOSIT";
/// Transaction type recorded for withdrawals.
pub const TYPE_WITHDRAW: &str = "WITHDRAW";
/// Transaction type recorded for transfers.
pub const TYPE_TRANSFER: &str = "TRANSFER";

/// Generate a fresh transaction reference: `"<PREFIX>-<8 uppercase hex>"`.
///
/// The reference is the externally meaningful identifier on statements and
/// notifications; the unique index on `transactions.reference` guarantees
/// global uniqueness.
pub fn new_reference(prefix: &str) -> String {
    format!("{}-{:08X}", prefix, rand::random::<u32>())
}

/// Deposit money into the caller's wallet.
///
/// # Process
///
/// 1. Validate the amount
/// 2. Lock the wallet (`WalletNotFound` if absent)
/// 3. Resolve the credit target: the explicit card if given
///    (`CardNotFound` if it is not the wallet's), otherwise the default
///    card via `ensure_default_card`
/// 4. Credit wallet and card
/// 5. Append the DEPOSIT transaction
/// 6. Emit a notification after commit; return the transaction
pub async fn deposit(
    state: &AppState,
    user_id: Uuid,
    request: DepositRequest,
) -> Result<Transaction, AppError> {
    allocator::validate_amount(request.amount_cents)?;

    let (transaction, event) = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let wallet = wallet_service::fetch_wallet_for_update(&mut *conn, user_id)
                .await?
                .ok_or(AppError::WalletNotFound)?;

            let card = match request.card_id {
                Some(card_id) => card_service::fetch_wallet_card(&mut *conn, wallet.id, card_id)
                    .await?
                    .ok_or(AppError::CardNotFound)?,
                None => card_service::ensure_default_card(&mut *conn, &wallet).await?,
            };

            wallet_service::credit_wallet(&mut *conn, wallet.id, request.amount_cents).await?;
            card_service::credit_card(&mut *conn, card.id, request.amount_cents).await?;

            let transaction = insert_transaction(
                &mut *conn,
                NewTransaction {
                    reference: new_reference("DEP"),
                    transaction_type: TYPE_DEPOSIT,
                    sender_id: None,
                    receiver_id: Some(user_id),
                    card_id: Some(card.id),
                    card_last4: Some(card.last4()),
                    amount_cents: request.amount_cents,
                    description: request.description,
                },
            )
            .await?;

            let event = notifier_service::deposit_event(user_id, &wallet.currency, &transaction);
            Ok((transaction, event))
        })
    })
    .await?;

    notifier_service::spawn_notify(state.pool.clone(), state.notifier.clone(), vec![event]);
    Ok(transaction)
}

/// Withdraw money from the caller's wallet.
///
/// # Process
///
/// 1. Validate the amount and enforce the per-operation ceiling
/// 2. Lock the wallet; fail `InsufficientFunds` if the balance does not
///    cover the amount
/// 3. Debit the wallet
/// 4. Debit card(s): the explicit card whole (it must be active and cover
///    the amount), or auto-split across cards in allocation order
/// 5. Append the WITHDRAW transaction carrying the first debited card
/// 6. Emit a notification after commit; return the transaction
pub async fn withdraw(
    state: &AppState,
    user_id: Uuid,
    request: WithdrawRequest,
) -> Result<Transaction, AppError> {
    allocator::validate_amount(request.amount_cents)?;
    allocator::check_ceiling(request.amount_cents)?;

    let (transaction, event) = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let wallet = wallet_service::fetch_wallet_for_update(&mut *conn, user_id)
                .await?
                .ok_or(AppError::WalletNotFound)?;

            if wallet.balance_cents < request.amount_cents {
                return Err(AppError::InsufficientFunds);
            }

            wallet_service::debit_wallet(&mut *conn, wallet.id, request.amount_cents).await?;

            let (debits, primary) =
                resolve_debits(&mut *conn, &wallet, request.card_id, request.amount_cents).await?;
            for debit in &debits {
                card_service::debit_card(&mut *conn, debit.card_id, debit.amount_cents).await?;
            }

            let (card_id, card_last4) = primary.unzip();
            let transaction = insert_transaction(
                &mut *conn,
                NewTransaction {
                    reference: new_reference("WDL"),
                    transaction_type: TYPE_WITHDRAW,
                    sender_id: Some(user_id),
                    receiver_id: None,
                    card_id,
                    card_last4,
                    amount_cents: request.amount_cents,
                    description: request.description,
                },
            )
            .await?;

            let event = notifier_service::withdraw_event(user_id, &wallet.currency, &transaction);
            Ok((transaction, event))
        })
    })
    .await?;

    notifier_service::spawn_notify(state.pool.clone(), state.notifier.clone(), vec![event]);
    Ok(transaction)
}

/// Transfer money to another wallet identified by account number.
///
/// # Process
///
/// 1. Validate the amount and enforce the per-operation ceiling
/// 2. Lock the sender wallet (`WalletNotFound`) and the receiver wallet by
///    account number (`RecipientNotFound`)
/// 3. Fail `SelfTransfer` when both resolve to the same wallet
/// 4. Fail `InsufficientFunds` when the sender balance does not cover
/// 5. Move the wallet balances, debit sender card(s), and credit the
///    receiver's default-or-oldest card if one exists (a cardless receiver
///    keeps the wallet-side credit only)
/// 6. Append the TRANSFER transaction carrying the sender's debited card
/// 7. Emit sender and receiver notifications after commit
pub async fn transfer(
    state: &AppState,
    sender_id: Uuid,
    request: TransferRequest,
) -> Result<Transaction, AppError> {
    allocator::validate_amount(request.amount_cents)?;
    allocator::check_ceiling(request.amount_cents)?;

    let (transaction, events) = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let sender_wallet = wallet_service::fetch_wallet_for_update(&mut *conn, sender_id)
                .await?
                .ok_or(AppError::WalletNotFound)?;
            let receiver_wallet = wallet_service::fetch_wallet_by_account_for_update(
                &mut *conn,
                &request.receiver_account_number,
            )
            .await?
            .ok_or(AppError::RecipientNotFound)?;

            if sender_wallet.id == receiver_wallet.id {
                return Err(AppError::SelfTransfer);
            }
            if sender_wallet.balance_cents < request.amount_cents {
                return Err(AppError::InsufficientFunds);
            }

            wallet_service::debit_wallet(&mut *conn, sender_wallet.id, request.amount_cents)
                .await?;
            wallet_service::credit_wallet(&mut *conn, receiver_wallet.id, request.amount_cents)
                .await?;

            let (debits, primary) = resolve_debits(
                &mut *conn,
                &sender_wallet,
                request.card_id,
                request.amount_cents,
            )
            .await?;
            for debit in &debits {
                card_service::debit_card(&mut *conn, debit.card_id, debit.amount_cents).await?;
            }

            // Best effort on the receiver side: credit the default-or-oldest
            // card when one exists, otherwise the wallet credit stands alone.
            let receiver_card =
                card_service::find_credit_card(&mut *conn, receiver_wallet.id).await?;
            if let Some(ref card) = receiver_card {
                card_service::credit_card(&mut *conn, card.id, request.amount_cents).await?;
            }

            let (card_id, card_last4) = primary.unzip();
            let transaction = insert_transaction(
                &mut *conn,
                NewTransaction {
                    reference: new_reference("TRF"),
                    transaction_type: TYPE_TRANSFER,
                    sender_id: Some(sender_id),
                    receiver_id: Some(receiver_wallet.user_id),
                    card_id,
                    card_last4,
                    amount_cents: request.amount_cents,
                    description: request.description,
                },
            )
            .await?;

            let events = vec![
                notifier_service::transfer_sent_event(
                    sender_id,
                    &sender_wallet.currency,
                    &receiver_wallet.account_number,
                    &transaction,
                ),
                notifier_service::transfer_received_event(
                    receiver_wallet.user_id,
                    &receiver_wallet.currency,
                    receiver_card.as_ref().map(|card| card.last4()),
                    &transaction,
                ),
            ];
            Ok((transaction, events))
        })
    })
    .await?;

    notifier_service::spawn_notify(state.pool.clone(), state.notifier.clone(), events);
    Ok(transaction)
}

/// Transaction history for a user, newest first.
///
/// Read-only: returns every transaction where the user is sender or
/// receiver. The secondary sort on `id` keeps repeated reads identically
/// ordered when timestamps collide.
pub async fn history(pool: &db::DbPool, user_id: Uuid) -> Result<Vec<Transaction>, AppError> {
    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE sender_id = $1 OR receiver_id = $1
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(transactions)
}

/// Fetch one transaction, verifying the caller is a party to it.
pub async fn get_transaction(
    pool: &db::DbPool,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, AppError> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE id = $1 AND (sender_id = $2 OR receiver_id = $2)
        "#,
    )
    .bind(transaction_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::TransactionNotFound)
}

/// Resolve which cards absorb a debit, already validated against the wallet
/// balance.
///
/// Explicit mode: the chosen card must belong to the wallet, be active, and
/// cover the entire amount. Auto-split mode: the allocator plans across the
/// wallet's cards; a shortfall (cards exhausted before the amount was
/// covered) is tolerated, since the wallet balance is the source of truth,
/// and logged for reconciliation.
///
/// Returns the per-card debits plus the (card id, last4) recorded on the
/// transaction.
async fn resolve_debits(
    conn: &mut PgConnection,
    wallet: &Wallet,
    explicit_card: Option<Uuid>,
    amount_cents: i64,
) -> Result<(Vec<allocator::CardDebit>, Option<(Uuid, String)>), AppError> {
    match explicit_card {
        Some(card_id) => {
            let card = card_service::fetch_wallet_card(&mut *conn, wallet.id, card_id)
                .await?
                .ok_or(AppError::CardNotFound)?;
            let debit = allocator::plan_explicit_debit(&card, amount_cents)?;
            let primary = (debit.card_id, debit.card_last4.clone());
            Ok((vec![debit], Some(primary)))
        }
        None => {
            let cards = card_service::fetch_cards_for_update(&mut *conn, wallet.id).await?;
            let plan = allocator::plan_debit(&cards, amount_cents);
            if plan.shortfall_cents > 0 {
                tracing::warn!(
                    wallet_id = %wallet.id,
                    shortfall_cents = plan.shortfall_cents,
                    "card balances did not cover the full debit"
                );
            }
            let primary = plan
                .primary()
                .map(|debit| (debit.card_id, debit.card_last4.clone()));
            Ok((plan.debits, primary))
        }
    }
}

/// Fields for a new ledger row; `status` defaults to COMPLETED in the store.
struct NewTransaction {
    reference: String,
    transaction_type: &'static str,
    sender_id: Option<Uuid>,
    receiver_id: Option<Uuid>,
    card_id: Option<Uuid>,
    card_last4: Option<String>,
    amount_cents: i64,
    description: Option<String>,
}

/// Append one row to the transaction log.
async fn insert_transaction(
    conn: &mut PgConnection,
    new: NewTransaction,
) -> Result<Transaction, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            reference,
            transaction_type,
            sender_id,
            receiver_id,
            card_id,
            card_last4,
            amount_cents,
            description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&new.reference)
    .bind(new.transaction_type)
    .bind(new.sender_id)
    .bind(new.receiver_id)
    .bind(new.card_id)
    .bind(new.card_last4)
    .bind(new.amount_cents)
    .bind(new.description)
    .fetch_one(conn)
    .await?;

    Ok(transaction)
}

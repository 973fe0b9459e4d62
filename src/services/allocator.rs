//! Balance allocator - pure card-selection logic for debits.
//!
//! Given a wallet's cards and a requested amount, this module decides which
//! card(s) absorb the debit and how a multi-card debit is split. It performs
//! no I/O and mutates nothing; the ledger engine applies the returned plan
//! inside its atomic write scope. Keeping the split a pure value makes it
//! independently testable.
//!
//! # Ordering
//!
//! Auto-split walks cards ordered by (`is_default` desc, `created_at` asc):
//! the default card absorbs debits first, preserving the "everyday card"
//! mental model, and older cards drain before newer ones.

use uuid::Uuid;

use crate::{error::AppError, models::card::Card};

/// Maximum amount a single withdraw or transfer may move, in minor units
/// (5,000,000 currency units). Applied to the requested amount before any
/// allocation, regardless of available balance.
pub const SINGLE_DEBIT_CEILING_CENTS: i64 = 500_000_000;

/// One card's share of a debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDebit {
    pub card_id: Uuid,
    pub card_last4: String,
    pub amount_cents: i64,
}

/// The allocation decided for an auto-split debit.
///
/// `debits` holds only non-zero contributions, in allocation order; the
/// first entry is the card recorded on the transaction. `shortfall_cents`
/// is whatever the cards could not cover; the wallet balance remains the
/// source of truth, so a shortfall does not fail the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitPlan {
    pub debits: Vec<CardDebit>,
    pub shortfall_cents: i64,
}

impl DebitPlan {
    /// The first card that contributes a non-zero debit, recorded as the
    /// transaction's card.
    pub fn primary(&self) -> Option<&CardDebit> {
        self.debits.first()
    }
}

/// Reject non-positive amounts.
///
/// Re-validated here even though the HTTP boundary already checks, so the
/// engine stays safe when called from other entry points (tests, future
/// internal callers).
pub fn validate_amount(amount_cents: i64) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::InvalidAmount);
    }
    Ok(())
}

/// Enforce the per-operation withdrawal ceiling.
pub fn check_ceiling(amount_cents: i64) -> Result<(), AppError> {
    if amount_cents > SINGLE_DEBIT_CEILING_CENTS {
        return Err(AppError::LimitExceeded);
    }
    Ok(())
}

/// Plan an auto-split debit across a wallet's cards.
///
/// Cards are ordered by (`is_default` desc, `created_at` asc) and greedily
/// drained until the amount is covered or every card is exhausted. Blocked
/// cards and cards with zero or negative balance are skipped.
pub fn plan_debit(cards: &[Card], amount_cents: i64) -> DebitPlan {
    let mut ordered: Vec<&Card> = cards.iter().collect();
    ordered.sort_by_key(|card| (std::cmp::Reverse(card.is_default), card.created_at));

    let mut remaining = amount_cents;
    let mut debits = Vec::new();

    for card in ordered {
        if remaining == 0 {
            break;
        }
        if card.is_blocked() || card.balance_cents <= 0 {
            continue;
        }

        let take = remaining.min(card.balance_cents);
        debits.push(CardDebit {
            card_id: card.id,
            card_last4: card.last4(),
            amount_cents: take,
        });
        remaining -= take;
    }

    DebitPlan {
        debits,
        shortfall_cents: remaining,
    }
}

/// Plan a debit against an explicitly chosen card.
///
/// No splitting occurs in this mode: the card must be active and must cover
/// the entire amount.
///
/// # Errors
///
/// - `CardFrozen` if the card is blocked
/// - `InsufficientCardFunds` if the card balance does not cover the amount
pub fn plan_explicit_debit(card: &Card, amount_cents: i64) -> Result<CardDebit, AppError> {
    if card.is_blocked() {
        return Err(AppError::CardFrozen);
    }
    if card.balance_cents < amount_cents {
        return Err(AppError::InsufficientCardFunds);
    }

    Ok(CardDebit {
        card_id: card.id,
        card_last4: card.last4(),
        amount_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::rstest;

    use crate::models::card::{STATUS_ACTIVE, STATUS_BLOCKED};

    /// Build a card with the fields the allocator looks at; `age_days`
    /// orders creation (larger = older).
    fn card(balance_cents: i64, is_default: bool, age_days: i64, blocked: bool) -> Card {
        Card {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            card_number: "5123456789012345".to_string(),
            cvv: "123".to_string(),
            expiry_date: Utc::now(),
            card_holder_name: "Ada Obi".to_string(),
            card_type: "DEBIT".to_string(),
            card_tier: "PLATINUM".to_string(),
            network: "MASTERCARD".to_string(),
            balance_cents,
            status: if blocked { STATUS_BLOCKED } else { STATUS_ACTIVE }.to_string(),
            is_default,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn single_card_absorbs_the_whole_debit() {
        let cards = vec![card(10_000, true, 1, false)];
        let plan = plan_debit(&cards, 3_000);

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].amount_cents, 3_000);
        assert_eq!(plan.shortfall_cents, 0);
    }

    #[test]
    fn default_card_drains_before_older_richer_card() {
        // Wallet with [A: 2000, default] and [B: 5000, older]; a 3000 debit
        // drains A fully and takes 1000 from B, with A as the primary card.
        let a = card(2_000, true, 1, false);
        let b = card(5_000, false, 10, false);
        let a_id = a.id;
        let b_id = b.id;

        let plan = plan_debit(&[b.clone(), a.clone()], 3_000);

        assert_eq!(plan.debits.len(), 2);
        assert_eq!(plan.debits[0].card_id, a_id);
        assert_eq!(plan.debits[0].amount_cents, 2_000);
        assert_eq!(plan.debits[1].card_id, b_id);
        assert_eq!(plan.debits[1].amount_cents, 1_000);
        assert_eq!(plan.primary().unwrap().card_id, a_id);
        assert_eq!(plan.shortfall_cents, 0);
    }

    #[test]
    fn non_default_cards_drain_oldest_first() {
        let older = card(1_000, false, 30, false);
        let newer = card(1_000, false, 5, false);
        let older_id = older.id;

        let plan = plan_debit(&[newer, older], 1_500);

        assert_eq!(plan.debits[0].card_id, older_id);
        assert_eq!(plan.debits[0].amount_cents, 1_000);
        assert_eq!(plan.debits[1].amount_cents, 500);
    }

    #[test]
    fn zero_and_negative_balance_cards_are_skipped() {
        let empty = card(0, true, 1, false);
        let negative = card(-200, false, 2, false);
        let funded = card(4_000, false, 3, false);
        let funded_id = funded.id;

        let plan = plan_debit(&[empty, negative, funded], 3_000);

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.primary().unwrap().card_id, funded_id);
        assert_eq!(plan.shortfall_cents, 0);
    }

    #[test]
    fn blocked_cards_are_skipped() {
        let frozen = card(10_000, true, 1, true);
        let active = card(2_000, false, 2, false);
        let active_id = active.id;

        let plan = plan_debit(&[frozen, active], 1_500);

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].card_id, active_id);
    }

    #[test]
    fn exhausted_cards_leave_a_shortfall() {
        let cards = vec![card(1_000, true, 1, false), card(500, false, 2, false)];
        let plan = plan_debit(&cards, 5_000);

        assert_eq!(plan.debits.len(), 2);
        assert_eq!(plan.shortfall_cents, 3_500);
    }

    #[test]
    fn no_cards_means_full_shortfall_and_no_primary() {
        let plan = plan_debit(&[], 2_000);

        assert!(plan.debits.is_empty());
        assert!(plan.primary().is_none());
        assert_eq!(plan.shortfall_cents, 2_000);
    }

    #[test]
    fn explicit_debit_requires_full_cover() {
        let short = card(2_999, false, 1, false);
        assert!(matches!(
            plan_explicit_debit(&short, 3_000),
            Err(AppError::InsufficientCardFunds)
        ));

        let exact = card(3_000, false, 1, false);
        let debit = plan_explicit_debit(&exact, 3_000).unwrap();
        assert_eq!(debit.amount_cents, 3_000);
    }

    #[test]
    fn explicit_debit_rejects_blocked_card() {
        let frozen = card(10_000, true, 1, true);
        assert!(matches!(
            plan_explicit_debit(&frozen, 100),
            Err(AppError::CardFrozen)
        ));
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    fn non_positive_amounts_are_invalid(#[case] amount: i64) {
        assert!(matches!(
            validate_amount(amount),
            Err(AppError::InvalidAmount)
        ));
    }

    #[test]
    fn ceiling_is_inclusive() {
        assert!(check_ceiling(SINGLE_DEBIT_CEILING_CENTS).is_ok());
        assert!(matches!(
            check_ceiling(SINGLE_DEBIT_CEILING_CENTS + 1),
            Err(AppError::LimitExceeded)
        ));
    }
}

//! Card lifecycle HTTP handlers.
//!
//! This module implements the card-related API endpoints:
//! - POST /api/v1/cards - Issue a new card
//! - GET /api/v1/cards - List the caller's cards
//! - POST /api/v1/cards/:id/freeze - Block a card
//! - POST /api/v1/cards/:id/unfreeze - Unblock a card
//! - DELETE /api/v1/cards/:id - Delete a card

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::card::{CardResponse, CreateCardRequest},
    services::card_service,
};

/// Issue an additional card for the caller's wallet.
///
/// # Response (201)
///
/// The created card with its CVV; this is the only response that ever
/// carries the CVV.
pub async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    let card = card_service::create_card(&state.pool, auth.user_id, request).await?;

    let cvv = card.cvv.clone();
    Ok((
        StatusCode::CREATED,
        Json(CardResponse::from(card).with_cvv(cvv)),
    ))
}

/// List the caller's cards, oldest first.
///
/// A lone card's balance is reported as the wallet balance (derived at read
/// time, never persisted).
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let cards = card_service::list_cards(&state.pool, auth.user_id).await?;

    let responses: Vec<CardResponse> = cards.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Freeze a card. No balance effect; a frozen card rejects explicit debits
/// and is skipped by auto-split.
pub async fn freeze_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = card_service::freeze_card(&state.pool, auth.user_id, card_id).await?;

    Ok(Json(card.into()))
}

/// Unfreeze a card.
pub async fn unfreeze_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = card_service::unfreeze_card(&state.pool, auth.user_id, card_id).await?;

    Ok(Json(card.into()))
}

/// Delete a card.
///
/// # Rules
///
/// - Rejected for the wallet's last remaining card
/// - Rejected while the card still holds a balance
/// - Deleting the default card promotes the oldest survivor
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    card_service::delete_card(&state.pool, auth.user_id, card_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

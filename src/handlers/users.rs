//! Registration handler.
//!
//! Registration is the only place a wallet is ever created: one request
//! atomically creates the user, their wallet, their first (default)
//! PLATINUM card, and an access token. The raw token and the card CVV are
//! returned once and never again.

use axum::{Json, extract::State, http::StatusCode};
use sqlx::PgConnection;

use crate::{
    AppState, db,
    error::AppError,
    middleware::auth,
    models::{
        card::CardResponse,
        user::{RegisterRequest, RegisterResponse, User},
    },
    services::{card_service, wallet_service},
};

/// Register a new user.
///
/// # Endpoint
///
/// `POST /api/v1/auth/register` (public)
///
/// # Request Body
///
/// ```json
/// {
///   "username": "ada",
///   "full_name": "Ada Obi"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: user, wallet, card (CVV included this
///   once), and the raw access token
/// - **Error (409)**: username already taken
/// - **Error (400)**: empty username or full name
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let username = request.username.trim().to_string();
    let full_name = request.full_name.trim().to_string();
    if username.is_empty() {
        return Err(AppError::InvalidRequest("Username is required".to_string()));
    }
    if full_name.is_empty() {
        return Err(AppError::InvalidRequest(
            "Full name is required".to_string(),
        ));
    }

    let raw_token = auth::generate_token();
    let token_hash = auth::hash_token(&raw_token);

    let response = db::with_atomic_write(&state.pool, move |conn: &mut PgConnection| {
        Box::pin(async move {
            let user = sqlx::query_as::<_, User>(
                "INSERT INTO users (username, full_name) VALUES ($1, $2) RETURNING *",
            )
            .bind(&username)
            .bind(&full_name)
            .fetch_one(&mut *conn)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::UsernameTaken
                }
                _ => AppError::from(err),
            })?;

            sqlx::query("INSERT INTO auth_tokens (user_id, token_hash) VALUES ($1, $2)")
                .bind(user.id)
                .bind(&token_hash)
                .execute(&mut *conn)
                .await?;

            let wallet = wallet_service::open_wallet(&mut *conn, user.id).await?;
            let card =
                card_service::issue_card(&mut *conn, wallet.id, &user.full_name, "PLATINUM", true)
                    .await?;

            let cvv = card.cvv.clone();
            Ok(RegisterResponse {
                user,
                wallet: wallet.into(),
                card: CardResponse::from(card).with_cvv(cvv),
                access_token: raw_token,
            })
        })
    })
    .await?;

    tracing::info!(username = %response.user.username, "user registered");

    Ok((StatusCode::CREATED, Json(response)))
}

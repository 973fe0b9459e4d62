//! Wallet HTTP handler.

use axum::{Extension, Json, extract::State};

use crate::{
    AppState, error::AppError, middleware::auth::AuthContext, models::wallet::WalletResponse,
    services::wallet_service,
};

/// Get the authenticated user's wallet.
///
/// # Endpoint
///
/// `GET /api/v1/wallet`
///
/// # Response
///
/// - **Success (200 OK)**: wallet details including balance and account
///   number
/// - **Error (404)**: the user has no wallet
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = wallet_service::get_wallet(&state.pool, auth.user_id).await?;

    Ok(Json(wallet.into()))
}

//! Bearer-token authentication middleware.
//!
//! This middleware is the identity provider boundary: it resolves a bearer
//! credential to a verified user id, which the ledger engine then trusts
//! without re-verifying. It intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject the authenticated user id into the request
//! 4. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AppState, error::AppError, models::user::AuthToken};

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; route handlers extract it to
/// know which user made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified id of the authenticated user
    pub user_id: Uuid,
}

/// SHA-256 hash of a raw token, hex encoded.
///
/// Tokens are stored only in this form; registration uses the same function
/// when persisting a freshly issued token.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a raw access token: 64 hex characters (32 random bytes).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Bearer-token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the `<token>` using SHA-256
/// 3. Query database for a matching hash where `is_active = true`
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidToken)?;

    // Expected format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidToken)?;

    let token_hash = hash_token(token);

    let record = sqlx::query_as::<_, AuthToken>(
        "SELECT id, user_id, token_hash, is_active, created_at
         FROM auth_tokens
         WHERE token_hash = $1 AND is_active = true",
    )
    .bind(&token_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidToken)?;

    let auth_context = AuthContext {
        user_id: record.user_id,
    };

    // Route handlers extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

//! In-app notification HTTP handlers.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    AppState, error::AppError, middleware::auth::AuthContext, models::notification::Notification,
    services::notifier_service,
};

/// List the caller's in-app notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = notifier_service::list_notifications(&state.pool, auth.user_id).await?;

    Ok(Json(notifications))
}

/// Mark one notification as read.
///
/// Returns 404 if the notification does not exist or belongs to another
/// user.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification =
        notifier_service::mark_read(&state.pool, auth.user_id, notification_id).await?;

    Ok(Json(notification))
}

use crate::api::AppState;
use crate::session::Session;
use axum::{extract::Extension, http::StatusCode};
use tracing::{info, warn};

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses (
        (status = 204, description = "Session revoked, or nothing to revoke")
    ),
    security (("bearer_token" = [])),
    tag = "auth"
)]
// axum handler for logout; idempotent, an unauthenticated call is still a 204
pub async fn logout(
    Extension(state): Extension<AppState>,
    session: Option<Extension<Session>>,
) -> StatusCode {
    let Some(Extension(session)) = session else {
        return StatusCode::NO_CONTENT;
    };

    let record = &session.record;
    match state
        .store()
        .delete_by_token(record.user_id, &record.token)
        .await
    {
        Ok(removed) => info!(user_id = %record.user_id, removed, "session revoked"),
        Err(error) => warn!("Failed to delete session: {:?}", error),
    }

    if let Err(error) = state.cache().remove(&record.token).await {
        warn!("Failed to evict session from cache: {:?}", error);
    }

    StatusCode::NO_CONTENT
}

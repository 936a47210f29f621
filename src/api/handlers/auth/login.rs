use super::types::{ErrorResponse, LoginRequest, LoginResponse, UserView};
use crate::api::AppState;
use crate::authz::resolve_permissions;
use crate::session::{SessionRecord, SessionUser, SESSION_TAG};
use crate::users::{normalize_email, valid_email, verify_password};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};
use uuid::Uuid;

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal Server Error")),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Credentials accepted, session created", body = LoginResponse),
        (status = 400, description = "Unknown user or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Session could not be created", body = ErrorResponse)
    ),
    tag = "auth"
)]
// axum handler for login
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let email = normalize_email(&payload.email);
    // A malformed address cannot match a user; same answer as a miss so the
    // response does not leak which addresses exist.
    if !valid_email(&email) {
        return bad_request("User not found");
    }

    let user = match state.users().find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => return bad_request("User not found"),
        Err(error) => {
            error!("Failed to look up user: {:?}", error);
            return internal_error();
        }
    };

    if !user.is_active {
        return bad_request("User not found");
    }

    if !verify_password(&payload.password, &user.password_hash) {
        return bad_request("Invalid Credentials");
    }

    let permissions =
        match resolve_permissions(state.roles(), user.tenant_id, &user.roles).await {
            Ok(permissions) => permissions,
            Err(error) => {
                error!("Failed to resolve permissions: {:?}", error);
                return internal_error();
            }
        };

    let now = Utc::now();
    let (token, _claims) = match state.issuer().issue(user.id, &user.roles, now.timestamp()) {
        Ok(issued) => issued,
        Err(error) => {
            error!("Failed to issue token: {:?}", error);
            return internal_error();
        }
    };

    let record = SessionRecord {
        id: Uuid::new_v4(),
        user_id: user.id,
        tenant_id: user.tenant_id,
        token: token.clone(),
        user: SessionUser {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles: user.roles.clone(),
            permissions: permissions.iter().copied().collect(),
        },
        created_at: now,
        expires_at: now + Duration::seconds(state.config().session_ttl_seconds()),
    };

    // The store is the source of truth; a session that is not durable must
    // not be handed out.
    if let Err(error) = state.store().insert(&record).await {
        error!("Failed to persist session: {:?}", error);
        return internal_error();
    }

    // Cache priming is best effort; the resolver refills on miss.
    let cache_ttl =
        StdDuration::from_secs(u64::try_from(state.config().session_ttl_seconds()).unwrap_or(0));
    if let Err(error) = state.cache().put(&record, cache_ttl, SESSION_TAG).await {
        warn!("Failed to prime session cache: {:?}", error);
    }

    info!(user_id = %user.id, "session created");

    let response = LoginResponse {
        token,
        user: UserView::from_record(&user, &permissions),
        expires_at: record.expires_at,
    };
    (StatusCode::OK, Json(response)).into_response()
}

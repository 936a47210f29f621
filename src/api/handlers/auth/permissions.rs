use super::types::ErrorResponse;
use crate::authz::Permission;
use crate::session::Session;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

#[utoipa::path(
    get,
    path = "/auth/permissions",
    responses (
        (status = 200, description = "Effective permissions of the caller", body = Vec<String>),
        (status = 401, description = "No resolvable session", body = ErrorResponse)
    ),
    security (("bearer_token" = [])),
    tag = "auth"
)]
// axum handler for the caller's effective permissions
pub async fn my_permissions(session: Option<Extension<Session>>) -> Response {
    let Some(Extension(session)) = session else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response();
    };

    let permissions: Vec<Permission> = session.claims.permissions().collect();
    Json(permissions).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/permissions/all",
    responses (
        (status = 200, description = "The full permission catalogue", body = Vec<String>),
        (status = 401, description = "No resolvable session"),
        (status = 403, description = "Caller may not manage users")
    ),
    security (("bearer_token" = [])),
    tag = "auth"
)]
// axum handler for the permission catalogue; policy-guarded at the route
pub async fn all_permissions() -> Json<Vec<Permission>> {
    Json(Permission::ALL.to_vec())
}

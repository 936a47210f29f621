//! HTTP surface: routing, middleware stack, and server startup.

use crate::authz::{
    enforce_policies,
    roles::{CachedRoleDirectory, PgRoleDirectory, RoleDirectory},
    Permission, PolicyGuard, PolicyRegistry,
};
use crate::session::{
    purge_expired_periodically, resolve_session, PgSessionStore, RedisSessionCache,
};
use crate::token::TokenIssuer;
use crate::users::PgUserDirectory;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use redis::aio::ConnectionManager;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub(crate) mod handlers;
mod openapi;
mod state;

pub use state::{AppState, AuthConfig};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Build the application router for the given state.
///
/// The session resolver wraps every route; policy guards only the routes that
/// declare them. Exposed separately from [`new`] so tests can drive the full
/// stack with in-memory backends.
#[must_use]
pub fn router(state: &AppState) -> Router {
    let resolver = Arc::new(state.resolver());
    let catalogue_guard = PolicyGuard::new(
        state.policies().clone(),
        [Permission::UserManagementRead.as_str()],
    );

    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(openapi::serve))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/permissions", get(handlers::auth::my_permissions))
        .route(
            "/auth/permissions/all",
            get(handlers::auth::all_permissions).layer(middleware::from_fn_with_state(
                catalogue_guard,
                enforce_policies,
            )),
        )
        .layer(middleware::from_fn_with_state(resolver, resolve_session))
        .layer(Extension(state.clone()))
}

/// Start the server.
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    redis_url: String,
    jwt_secret: SecretString,
    config: AuthConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let redis_client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;

    let issuer = Arc::new(TokenIssuer::new(
        jwt_secret,
        config.issuer().to_string(),
        config.audience().to_string(),
        config.token_ttl_seconds(),
    )?);

    let roles: Arc<dyn RoleDirectory> = Arc::new(CachedRoleDirectory::new(Arc::new(
        PgRoleDirectory::new(pool.clone()),
    )));

    let state = AppState::new(
        issuer,
        Arc::new(PgSessionStore::new(pool.clone())),
        Arc::new(RedisSessionCache::new(redis_conn)),
        Arc::new(PgUserDirectory::new(pool)),
        roles,
        Arc::new(PolicyRegistry::platform_defaults()),
        config,
    );

    tokio::task::spawn(purge_expired_periodically(
        state.store().clone(),
        SESSION_PURGE_INTERVAL,
    ));

    let frontend_origin = frontend_origin(state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router(&state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path_and_keeps_port() -> Result<()> {
        assert_eq!(
            frontend_origin("https://antrepo.dev/app/")?,
            HeaderValue::from_static("https://antrepo.dev")
        );
        assert_eq!(
            frontend_origin("http://localhost:3000")?,
            HeaderValue::from_static("http://localhost:3000")
        );
        assert!(frontend_origin("not a url").is_err());
        Ok(())
    }
}

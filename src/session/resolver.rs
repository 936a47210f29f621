//! Cache-aside session resolution middleware.
//!
//! Resolution never fails a request. Any problem along the way (bad token,
//! revoked session, slow backend) downgrades the request to anonymous and the
//! policy layer decides what anonymous is allowed to do.

use super::cache::{SessionCache, SESSION_TAG};
use super::language::Language;
use super::model::{Session, SessionRecord};
use super::store::SessionStore;
use crate::authz::{augment_claims, roles::RoleDirectory};
use crate::token::TokenIssuer;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2000);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Resolves bearer tokens into request sessions.
pub struct SessionResolver {
    issuer: Arc<TokenIssuer>,
    cache: Arc<dyn SessionCache>,
    store: Arc<dyn SessionStore>,
    roles: Arc<dyn RoleDirectory>,
    lookup_timeout: Duration,
    cache_ttl: Duration,
    default_language: Language,
}

impl SessionResolver {
    #[must_use]
    pub fn new(
        issuer: Arc<TokenIssuer>,
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn SessionStore>,
        roles: Arc<dyn RoleDirectory>,
    ) -> Self {
        Self {
            issuer,
            cache,
            store,
            roles,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            default_language: Language::default(),
        }
    }

    #[must_use]
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    #[must_use]
    pub fn with_default_language(mut self, default_language: Language) -> Self {
        self.default_language = default_language;
        self
    }

    /// Resolve a presented bearer token into a session, or `None` for
    /// anonymous.
    ///
    /// The token is verified cryptographically before any backend is
    /// touched; the store lookup afterwards is purely a revocation check.
    pub async fn resolve(&self, token: &str, accept_language: Option<&str>) -> Option<Session> {
        let now = chrono::Utc::now();
        let claims = match self.issuer.verify(token, now.timestamp()) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "rejecting unverifiable bearer token");
                return None;
            }
        };
        let user_id = match claims.user_id() {
            Ok(user_id) => user_id,
            Err(err) => {
                debug!(error = %err, "rejecting token with malformed subject");
                return None;
            }
        };

        let record = match self.lookup(user_id, token).await {
            Some(record) => record,
            None => return None,
        };
        // The cache is keyed by token; a mismatched snapshot means a
        // poisoned or stale entry and the session does not resolve.
        if record.user_id != user_id || record.expires_at <= now {
            return None;
        }

        let mut claim_set = record.claim_set();
        augment_claims(&self.roles, record.tenant_id, &mut claim_set).await;

        Some(Session {
            language: Language::parse(accept_language, self.default_language),
            claims: claim_set,
            record,
        })
    }

    async fn lookup(&self, user_id: uuid::Uuid, token: &str) -> Option<SessionRecord> {
        match timeout(self.lookup_timeout, self.cache.get(token)).await {
            Ok(Ok(Some(record))) => return Some(record),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => warn!(error = %err, "session cache lookup failed"),
            Err(_) => warn!("session cache lookup timed out"),
        }

        let record = match timeout(self.lookup_timeout, self.store.find_by_token(user_id, token))
            .await
        {
            Ok(Ok(found)) => found?,
            Ok(Err(err)) => {
                warn!(error = %err, "session store lookup failed");
                return None;
            }
            Err(_) => {
                warn!("session store lookup timed out");
                return None;
            }
        };

        if let Err(err) = self.cache.put(&record, self.cache_ttl, SESSION_TAG).await {
            warn!(error = %err, "failed to refill session cache");
        }
        Some(record)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware attaching a [`Session`] extension to authenticated requests.
/// Requests without a resolvable session pass through anonymous.
pub async fn resolve_session(
    State(resolver): State<Arc<SessionResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_bearer_token(request.headers()).map(String::from);
    let accept_language = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    if let Some(token) = token {
        if let Some(session) = resolver.resolve(&token, accept_language.as_deref()).await {
            request.extensions_mut().insert(session);
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::roles::MemoryRoleDirectory;
    use crate::authz::Permission;
    use crate::session::cache::MemorySessionCache;
    use crate::session::model::SessionUser;
    use crate::session::store::MemorySessionStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Extension, Json, Router};
    use chrono::Utc;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "resolver-test-secret";

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(
            TokenIssuer::new(
                SecretString::from(SECRET),
                "https://identity.antrepo.dev".to_string(),
                "antrepo".to_string(),
                1800,
            )
            .expect("issuer"),
        )
    }

    fn record(user_id: Uuid, token: &str) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            user_id,
            tenant_id: None,
            token: token.to_string(),
            user: SessionUser {
                email: "clerk@example.com".to_string(),
                first_name: "Ayşe".to_string(),
                last_name: "Demir".to_string(),
                roles: vec!["Clerk".to_string()],
                permissions: vec![Permission::ProductRead],
            },
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::minutes(30),
        }
    }

    async fn whoami(session: Option<Extension<Session>>) -> Json<Value> {
        match session {
            Some(Extension(session)) => Json(json!({
                "authenticated": true,
                "email": session.record.user.email,
                "roles": session.claims.roles().collect::<Vec<_>>(),
                "canReadProducts": session.claims.has_permission(Permission::ProductRead),
                "canReadStock": session.claims.has_permission(Permission::StockRead),
                "language": session.language.code(),
            })),
            None => Json(json!({ "authenticated": false })),
        }
    }

    fn router(resolver: SessionResolver) -> Router {
        Router::new().route("/whoami", get(whoami)).layer(
            middleware::from_fn_with_state(Arc::new(resolver), resolve_session),
        )
    }

    async fn get_whoami(app: Router, authorization: Option<&str>, language: Option<&str>) -> Value {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        if let Some(language) = language {
            builder = builder.header(header::ACCEPT_LANGUAGE, language);
        }
        let request = builder.body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    struct Fixture {
        issuer: Arc<TokenIssuer>,
        cache: Arc<MemorySessionCache>,
        store: Arc<MemorySessionStore>,
        roles: Arc<MemoryRoleDirectory>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                issuer: issuer(),
                cache: Arc::new(MemorySessionCache::new()),
                store: Arc::new(MemorySessionStore::new()),
                roles: Arc::new(MemoryRoleDirectory::new()),
            }
        }

        fn resolver(&self) -> SessionResolver {
            SessionResolver::new(
                self.issuer.clone(),
                self.cache.clone(),
                self.store.clone(),
                self.roles.clone(),
            )
        }

        /// Issue a token and persist the matching session.
        async fn login(&self, user_id: Uuid) -> String {
            let (token, _) = self
                .issuer
                .issue(user_id, &["Clerk".to_string()], Utc::now().timestamp())
                .expect("issue");
            self.store
                .insert(&record(user_id, &token))
                .await
                .expect("insert");
            token
        }
    }

    #[tokio::test]
    async fn live_session_resolves_with_snapshot_claims() {
        let fixture = Fixture::new();
        let token = fixture.login(Uuid::new_v4()).await;

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["email"], "clerk@example.com");
        assert_eq!(body["roles"], json!(["Clerk"]));
        assert_eq!(body["canReadProducts"], true);
        assert_eq!(body["language"], "tr");
    }

    #[tokio::test]
    async fn role_directory_grants_augment_snapshot_claims() {
        let fixture = Fixture::new();
        fixture
            .roles
            .insert_role("Clerk", vec![Permission::StockRead])
            .await;
        let token = fixture.login(Uuid::new_v4()).await;

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(body["canReadProducts"], true);
        assert_eq!(body["canReadStock"], true);
    }

    #[tokio::test]
    async fn missing_session_record_means_anonymous() {
        let fixture = Fixture::new();
        let (token, _) = fixture
            .issuer
            .issue(Uuid::new_v4(), &["Clerk".to_string()], Utc::now().timestamp())
            .expect("issue");

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(body["authenticated"], false);
    }

    #[tokio::test]
    async fn tampered_token_means_anonymous() {
        let fixture = Fixture::new();
        let token = fixture.login(Uuid::new_v4()).await;
        let mut tampered = token.clone();
        let last = tampered.pop().expect("non-empty token");
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("Bearer {tampered}")),
            None,
        )
        .await;
        assert_eq!(body["authenticated"], false);
    }

    #[tokio::test]
    async fn malformed_authorization_header_means_anonymous() {
        let fixture = Fixture::new();
        let _ = fixture.login(Uuid::new_v4()).await;
        let app = router(fixture.resolver());

        for authorization in [None, Some("Token abc"), Some("Bearer "), Some("notascheme")] {
            let body = get_whoami(app.clone(), authorization, None).await;
            assert_eq!(body["authenticated"], false, "for {authorization:?}");
        }
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        let fixture = Fixture::new();
        let token = fixture.login(Uuid::new_v4()).await;

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("bearer {token}")),
            None,
        )
        .await;
        assert_eq!(body["authenticated"], true);
    }

    #[tokio::test]
    async fn expired_session_record_means_anonymous() {
        let fixture = Fixture::new();
        let user_id = Uuid::new_v4();
        let (token, _) = fixture
            .issuer
            .issue(user_id, &["Clerk".to_string()], Utc::now().timestamp())
            .expect("issue");
        let mut stale = record(user_id, &token);
        stale.expires_at = Utc::now() - chrono::Duration::minutes(1);
        fixture.store.insert(&stale).await.expect("insert");

        let body = get_whoami(
            router(fixture.resolver()),
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(body["authenticated"], false);
    }

    #[tokio::test]
    async fn cache_serves_sessions_after_store_loss() {
        let fixture = Fixture::new();
        let user_id = Uuid::new_v4();
        let token = fixture.login(user_id).await;
        let app = router(fixture.resolver());

        // First request refills the cache from the store.
        let body = get_whoami(app.clone(), Some(&format!("Bearer {token}")), None).await;
        assert_eq!(body["authenticated"], true);

        fixture
            .store
            .delete_by_token(user_id, &token)
            .await
            .expect("delete");

        // Still resolves until the cache entry ages out.
        let body = get_whoami(app, Some(&format!("Bearer {token}")), None).await;
        assert_eq!(body["authenticated"], true);
    }

    #[tokio::test]
    async fn accept_language_header_sets_session_language() {
        let fixture = Fixture::new();
        let token = fixture.login(Uuid::new_v4()).await;
        let app = router(fixture.resolver());

        let body = get_whoami(
            app.clone(),
            Some(&format!("Bearer {token}")),
            Some("en-US,tr;q=0.8"),
        )
        .await;
        assert_eq!(body["language"], "en");

        let body = get_whoami(app, Some(&format!("Bearer {token}")), Some("de-DE")).await;
        assert_eq!(body["language"], "tr");
    }

    struct StalledStore;

    #[async_trait]
    impl SessionStore for StalledStore {
        async fn insert(&self, _record: &SessionRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn find_by_token(
            &self,
            _user_id: Uuid,
            _token: &str,
        ) -> anyhow::Result<Option<SessionRecord>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn delete_by_token(&self, _user_id: Uuid, _token: &str) -> anyhow::Result<u64> {
            Ok(0)
        }

        async fn purge_expired(&self) -> anyhow::Result<u64> {
            Ok(0)
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_lookup_degrades_to_anonymous() {
        let fixture = Fixture::new();
        let (token, _) = fixture
            .issuer
            .issue(Uuid::new_v4(), &["Clerk".to_string()], Utc::now().timestamp())
            .expect("issue");

        let resolver = SessionResolver::new(
            fixture.issuer.clone(),
            fixture.cache.clone(),
            Arc::new(StalledStore),
            fixture.roles.clone(),
        )
        .with_lookup_timeout(Duration::from_millis(100));

        let body = get_whoami(router(resolver), Some(&format!("Bearer {token}")), None).await;
        assert_eq!(body["authenticated"], false);
    }
}

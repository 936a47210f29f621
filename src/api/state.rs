//! Shared application state and auth configuration.

use crate::authz::{roles::RoleDirectory, PolicyRegistry};
use crate::session::{Language, SessionCache, SessionResolver, SessionStore};
use crate::token::TokenIssuer;
use crate::users::UserDirectory;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2000;
const DEFAULT_ISSUER: &str = "https://identity.antrepo.dev";
const DEFAULT_AUDIENCE: &str = "antrepo";
const DEFAULT_FRONTEND_BASE_URL: &str = "https://antrepo.dev";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    audience: String,
    frontend_base_url: String,
    token_ttl_seconds: i64,
    session_ttl_seconds: i64,
    lookup_timeout_ms: u64,
    default_language: Language,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            default_language: Language::default(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, frontend_base_url: String) -> Self {
        self.frontend_base_url = frontend_base_url;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lookup_timeout_ms(mut self, millis: u64) -> Self {
        self.lookup_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn with_default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    #[must_use]
    pub fn default_language(&self) -> Language {
        self.default_language
    }
}

/// Everything handlers need, behind cheap clones.
#[derive(Clone)]
pub struct AppState {
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn SessionStore>,
    cache: Arc<dyn SessionCache>,
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleDirectory>,
    policies: Arc<PolicyRegistry>,
    config: AuthConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        issuer: Arc<TokenIssuer>,
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleDirectory>,
        policies: Arc<PolicyRegistry>,
        config: AuthConfig,
    ) -> Self {
        Self {
            issuer,
            store,
            cache,
            users,
            roles,
            policies,
            config,
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn SessionCache> {
        &self.cache
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    #[must_use]
    pub fn roles(&self) -> &Arc<dyn RoleDirectory> {
        &self.roles
    }

    #[must_use]
    pub fn policies(&self) -> &Arc<PolicyRegistry> {
        &self.policies
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the session resolver wired to this state's backends.
    #[must_use]
    pub fn resolver(&self) -> SessionResolver {
        SessionResolver::new(
            self.issuer.clone(),
            self.cache.clone(),
            self.store.clone(),
            self.roles.clone(),
        )
        .with_lookup_timeout(self.config.lookup_timeout())
        .with_cache_ttl(Duration::from_secs(
            u64::try_from(self.config.session_ttl_seconds).unwrap_or(0),
        ))
        .with_default_language(self.config.default_language)
    }
}

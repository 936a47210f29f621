//! Declarative route policies and the middleware that enforces them.
//!
//! Every guarded route names one or more registered policies; a request must
//! satisfy all of them. Unknown policy names fail closed.

use super::claims::ClaimSet;
use super::permission::Permission;
use super::{SUPER_ADMIN_ROLE, TENANT_ADMIN_ROLE};
use crate::session::Session;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A single authorization requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Requires the named role claim.
    Role(String),
    /// Requires the permission claim. The platform super-admin role
    /// satisfies every permission policy without holding the claim.
    Permission(Permission),
}

impl Policy {
    #[must_use]
    pub fn satisfied_by(&self, claims: &ClaimSet) -> bool {
        match self {
            Self::Role(role) => claims.has_role(role),
            Self::Permission(permission) => {
                claims.has_permission(*permission) || claims.has_role(SUPER_ADMIN_ROLE)
            }
        }
    }
}

/// Named policies, registered once at startup.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform's standard policy set: one policy per admin role and one
    /// per permission identifier, each named by its wire string.
    #[must_use]
    pub fn platform_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SUPER_ADMIN_ROLE, Policy::Role(SUPER_ADMIN_ROLE.to_string()));
        registry.register(
            TENANT_ADMIN_ROLE,
            Policy::Role(TENANT_ADMIN_ROLE.to_string()),
        );
        for permission in Permission::ALL {
            registry.register(permission.as_str(), Policy::Permission(permission));
        }
        registry
    }

    pub fn register(&mut self, name: &str, policy: Policy) {
        self.policies.insert(name.to_string(), policy);
    }

    /// Evaluate one named policy. A name with no registration never passes.
    #[must_use]
    pub fn evaluate(&self, name: &str, claims: &ClaimSet) -> bool {
        match self.policies.get(name) {
            Some(policy) => policy.satisfied_by(claims),
            None => {
                warn!(policy = name, "evaluating unregistered policy, denying");
                false
            }
        }
    }

    /// All named policies must pass.
    #[must_use]
    pub fn evaluate_all<'a, I>(&self, names: I, claims: &ClaimSet) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().all(|name| self.evaluate(name, claims))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Route-level guard: the policy names a route requires, bound to the shared
/// registry. Used as middleware state.
#[derive(Clone)]
pub struct PolicyGuard {
    registry: Arc<PolicyRegistry>,
    names: Vec<String>,
}

impl PolicyGuard {
    #[must_use]
    pub fn new<I, S>(registry: Arc<PolicyRegistry>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registry,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// No session at all is unauthenticated (401); an authenticated caller
    /// missing a required claim is forbidden (403).
    pub fn check(&self, claims: Option<&ClaimSet>) -> Result<(), StatusCode> {
        let Some(claims) = claims else {
            return Err(StatusCode::UNAUTHORIZED);
        };
        if self
            .registry
            .evaluate_all(self.names.iter().map(String::as_str), claims)
        {
            Ok(())
        } else {
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Middleware enforcing a [`PolicyGuard`] against the request's resolved
/// session.
pub async fn enforce_policies(
    State(guard): State<PolicyGuard>,
    request: Request,
    next: Next,
) -> Response {
    let claims = request.extensions().get::<Session>().map(|s| &s.claims);
    match guard.check(claims) {
        Ok(()) => next.run(request).await,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Claim;

    fn claims_with(claims: &[Claim]) -> ClaimSet {
        let mut set = ClaimSet::new();
        for claim in claims {
            set.push_unique(claim.clone());
        }
        set
    }

    #[test]
    fn role_policy_requires_exact_role() {
        let policy = Policy::Role("TenantAdmin".to_string());
        assert!(policy.satisfied_by(&claims_with(&[Claim::Role("TenantAdmin".to_string())])));
        assert!(!policy.satisfied_by(&claims_with(&[Claim::Role("Clerk".to_string())])));
    }

    #[test]
    fn permission_policy_requires_claim() {
        let policy = Policy::Permission(Permission::StockUpdate);
        assert!(policy.satisfied_by(&claims_with(&[Claim::Permission(Permission::StockUpdate)])));
        assert!(!policy.satisfied_by(&claims_with(&[Claim::Permission(Permission::StockRead)])));
    }

    #[test]
    fn super_admin_satisfies_every_permission_policy() {
        let claims = claims_with(&[Claim::Role(SUPER_ADMIN_ROLE.to_string())]);
        for permission in Permission::ALL {
            assert!(Policy::Permission(permission).satisfied_by(&claims));
        }
        // But not arbitrary role policies.
        assert!(!Policy::Role("TenantAdmin".to_string()).satisfied_by(&claims));
    }

    #[test]
    fn defaults_cover_admin_roles_and_catalogue() {
        let registry = PolicyRegistry::platform_defaults();
        assert_eq!(registry.len(), 2 + Permission::ALL.len());

        let admin = claims_with(&[Claim::Role(TENANT_ADMIN_ROLE.to_string())]);
        assert!(registry.evaluate(TENANT_ADMIN_ROLE, &admin));
        assert!(!registry.evaluate(SUPER_ADMIN_ROLE, &admin));

        let reader = claims_with(&[Claim::Permission(Permission::ProductRead)]);
        assert!(registry.evaluate("Product_Read", &reader));
        assert!(!registry.evaluate("Product_Delete", &reader));
    }

    #[test]
    fn unknown_policy_denies() {
        let registry = PolicyRegistry::platform_defaults();
        let claims = claims_with(&[Claim::Role(SUPER_ADMIN_ROLE.to_string())]);
        assert!(!registry.evaluate("NoSuchPolicy", &claims));
    }

    #[test]
    fn evaluate_all_is_a_conjunction() {
        let registry = PolicyRegistry::platform_defaults();
        let claims = claims_with(&[
            Claim::Permission(Permission::StockRead),
            Claim::Permission(Permission::StockUpdate),
        ]);
        assert!(registry.evaluate_all(["Stock_Read", "Stock_Update"], &claims));
        assert!(!registry.evaluate_all(["Stock_Read", "Stock_Delete"], &claims));
    }

    #[test]
    fn guard_maps_missing_session_and_missing_claims() {
        let registry = Arc::new(PolicyRegistry::platform_defaults());
        let guard = PolicyGuard::new(registry, ["Product_Read"]);

        assert_eq!(guard.check(None), Err(StatusCode::UNAUTHORIZED));
        let empty = ClaimSet::new();
        assert_eq!(guard.check(Some(&empty)), Err(StatusCode::FORBIDDEN));
        let reader = claims_with(&[Claim::Permission(Permission::ProductRead)]);
        assert_eq!(guard.check(Some(&reader)), Ok(()));
    }
}

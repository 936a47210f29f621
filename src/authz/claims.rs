//! Caller claim sets evaluated by policies.

use super::permission::Permission;
use crate::token::AccessTokenClaims;

/// One claim on an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Role(String),
    Permission(Permission),
}

/// The claim set carried by a request for the remainder of its processing.
///
/// This is explicit request-scoped state: it is built once (from the session
/// snapshot or from verified token claims), optionally augmented, and then
/// only read by policy evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a claim set from verified token claims (role claims only; the
    /// token never carries permissions).
    #[must_use]
    pub fn from_token_claims(claims: &AccessTokenClaims) -> Self {
        let mut set = Self::new();
        for role in &claims.roles {
            set.push_unique(Claim::Role(role.clone()));
        }
        set
    }

    /// Append a claim unless an equal one is already present.
    pub fn push_unique(&mut self, claim: Claim) {
        if !self.claims.contains(&claim) {
            self.claims.push(claim);
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.claims
            .iter()
            .any(|claim| matches!(claim, Claim::Role(name) if name == role))
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.claims
            .iter()
            .any(|claim| matches!(claim, Claim::Permission(value) if *value == permission))
    }

    /// Role names in insertion order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.claims.iter().filter_map(|claim| match claim {
            Claim::Role(name) => Some(name.as_str()),
            Claim::Permission(_) => None,
        })
    }

    /// Permission claims in insertion order.
    pub fn permissions(&self) -> impl Iterator<Item = Permission> + '_ {
        self.claims.iter().filter_map(|claim| match claim {
            Claim::Permission(permission) => Some(*permission),
            Claim::Role(_) => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

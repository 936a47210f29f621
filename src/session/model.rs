//! Session records and the request-scoped session.

use super::language::Language;
use crate::authz::{Claim, ClaimSet, Permission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of the user embedded in a session record.
///
/// Denormalized on purpose: resolving a session must not fan out to the user
/// and role tables on every request. The snapshot is taken at login and goes
/// stale together with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub permissions: Vec<Permission>,
}

/// A persisted session. Serialized shape is the wire contract shared with the
/// cache and the admin frontends, so field names are camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub token: String,
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Claims the snapshot grants: one role claim per role, one permission
    /// claim per snapshotted permission.
    #[must_use]
    pub fn claim_set(&self) -> ClaimSet {
        let mut claims = ClaimSet::new();
        for role in &self.user.roles {
            claims.push_unique(Claim::Role(role.clone()));
        }
        for permission in &self.user.permissions {
            claims.push_unique(Claim::Permission(*permission));
        }
        claims
    }
}

/// The resolved session attached to a request as an extension.
///
/// Routes read it; the policy middleware evaluates `claims`. Absence of this
/// extension means the request is anonymous.
#[derive(Debug, Clone)]
pub struct Session {
    pub record: SessionRecord,
    pub language: Language,
    pub claims: ClaimSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> SessionRecord {
        SessionRecord {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            tenant_id: None,
            token: "tok".to_string(),
            user: SessionUser {
                email: "clerk@example.com".to_string(),
                first_name: "Ayşe".to_string(),
                last_name: "Demir".to_string(),
                roles: vec!["Clerk".to_string()],
                permissions: vec![Permission::ProductRead, Permission::ProductRead],
            },
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts"),
            expires_at: Utc.timestamp_opt(1_700_003_600, 0).single().expect("ts"),
        }
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(record()).expect("serialize");
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json["user"].get("firstName").is_some());
        assert_eq!(json["user"]["permissions"][0], "Product_Read");
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn record_round_trips_through_json() {
        let original = record();
        let json = serde_json::to_string(&original).expect("serialize");
        let parsed: SessionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, original);
    }

    #[test]
    fn claim_set_covers_roles_and_permissions_once() {
        let claims = record().claim_set();
        assert!(claims.has_role("Clerk"));
        assert!(claims.has_permission(Permission::ProductRead));
        // The duplicated snapshot permission collapses.
        assert_eq!(claims.len(), 2);
    }
}

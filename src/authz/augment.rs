//! Claims augmentation: attach permission claims derived from role claims.

use super::claims::{Claim, ClaimSet};
use super::roles::RoleDirectory;
use super::SUPER_ADMIN_ROLE;
use std::sync::Arc;
use tracing::warn;

/// Expand the role claims in `claims` into permission claims.
///
/// Super admins skip augmentation entirely; policy evaluation recognizes the
/// role directly, so looking up grants for it would only add noise. Roles the
/// directory cannot resolve (missing, or a lookup failure) contribute nothing
/// rather than failing the request; augmentation runs on every authenticated
/// request and must not take the request down with it.
pub async fn augment_claims(
    directory: &Arc<dyn RoleDirectory>,
    tenant_id: Option<uuid::Uuid>,
    claims: &mut ClaimSet,
) {
    if claims.has_role(SUPER_ADMIN_ROLE) {
        return;
    }

    let roles: Vec<String> = claims.roles().map(String::from).collect();
    for role in roles {
        match directory.role_permissions(tenant_id, &role).await {
            Ok(Some(permissions)) => {
                for permission in permissions {
                    claims.push_unique(Claim::Permission(permission));
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(role, error = %err, "role lookup failed during claims augmentation");
            }
        }
    }
}

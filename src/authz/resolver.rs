//! Effective-permission resolution across a set of roles.

use super::permission::Permission;
use super::roles::RoleDirectory;
use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resolve the union of permissions granted by the given roles.
///
/// Roles unknown to the directory contribute nothing; duplicate grants
/// collapse. Directory failures propagate so the caller can distinguish "no
/// permissions" from "could not tell".
pub async fn resolve_permissions(
    directory: &Arc<dyn RoleDirectory>,
    tenant_id: Option<uuid::Uuid>,
    roles: &[String],
) -> Result<BTreeSet<Permission>> {
    let mut resolved = BTreeSet::new();
    for role in roles {
        if let Some(permissions) = directory.role_permissions(tenant_id, role).await? {
            resolved.extend(permissions);
        }
    }
    Ok(resolved)
}

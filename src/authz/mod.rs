//! Authorization primitives: permissions, claims, role lookups, claims
//! augmentation, and declarative route policies.

mod augment;
mod claims;
mod permission;
mod policy;
mod resolver;
pub mod roles;

pub use augment::augment_claims;
pub use claims::{Claim, ClaimSet};
pub use permission::{Permission, UnknownPermission, PERMISSION_CLAIM_TYPE};
pub use policy::{enforce_policies, Policy, PolicyGuard, PolicyRegistry};
pub use resolver::resolve_permissions;

/// Platform-wide super-admin role. Global (not tenant-scoped); authorized for
/// everything, so claims augmentation and permission policies short-circuit.
pub const SUPER_ADMIN_ROLE: &str = "SuperAdmin";

/// Tenant-scoped administrator role.
pub const TENANT_ADMIN_ROLE: &str = "TenantAdmin";

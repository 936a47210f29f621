//! Role directory: where role names resolve to permission claims.
//!
//! Roles are tenant-scoped; a NULL tenant means a platform-global role (the
//! super-admin role lives there). The directory is read-only for this
//! subsystem; role CRUD happens elsewhere.

use super::permission::{Permission, PERMISSION_CLAIM_TYPE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{warn, Instrument};
use uuid::Uuid;

/// Read access to roles and their permission claims.
///
/// `Ok(None)` means the role does not exist for the given scope; callers in
/// the augmentation path treat that the same as a role with no claims.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn role_permissions(
        &self,
        tenant_id: Option<Uuid>,
        role: &str,
    ) -> Result<Option<Vec<Permission>>>;
}

/// Postgres-backed directory. A role matches when it is scoped to the given
/// tenant or is platform-global.
pub struct PgRoleDirectory {
    pool: PgPool,
}

impl PgRoleDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn role_permissions(
        &self,
        tenant_id: Option<Uuid>,
        role: &str,
    ) -> Result<Option<Vec<Permission>>> {
        let query = r"
            SELECT rp.claim_value
            FROM roles r
            LEFT JOIN role_permissions rp
                ON rp.role_id = r.id AND rp.claim_type = $3
            WHERE r.name = $1
              AND (r.tenant_id IS NULL OR r.tenant_id = $2)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(role)
            .bind(tenant_id)
            .bind(PERMISSION_CLAIM_TYPE)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch role permissions")?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut permissions = Vec::new();
        for row in rows {
            let Some(value) = row.get::<Option<String>, _>("claim_value") else {
                continue;
            };
            match value.parse::<Permission>() {
                Ok(permission) => permissions.push(permission),
                // A stored value outside the catalogue grants nothing.
                Err(err) => warn!(role, error = %err, "skipping unknown permission claim"),
            }
        }
        Ok(Some(permissions))
    }
}

/// Caching wrapper around a directory.
///
/// Role claims change rarely and are read on hot paths, so lookups are an
/// N+1 hazard. Entries live until explicitly invalidated by the admin
/// surface that mutates roles.
pub struct CachedRoleDirectory {
    inner: Arc<dyn RoleDirectory>,
    entries: RwLock<HashMap<(Option<Uuid>, String), Option<Vec<Permission>>>>,
}

impl CachedRoleDirectory {
    #[must_use]
    pub fn new(inner: Arc<dyn RoleDirectory>) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the cached permission set for one role.
    pub async fn invalidate(&self, tenant_id: Option<Uuid>, role: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(&(tenant_id, role.to_string()));
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}

#[async_trait]
impl RoleDirectory for CachedRoleDirectory {
    async fn role_permissions(
        &self,
        tenant_id: Option<Uuid>,
        role: &str,
    ) -> Result<Option<Vec<Permission>>> {
        let key = (tenant_id, role.to_string());
        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(&key) {
                return Ok(cached.clone());
            }
        }

        let resolved = self.inner.role_permissions(tenant_id, role).await?;
        let mut entries = self.entries.write().await;
        entries.insert(key, resolved.clone());
        Ok(resolved)
    }
}

/// In-memory directory for tests and single-node setups.
#[derive(Default)]
pub struct MemoryRoleDirectory {
    roles: RwLock<HashMap<String, Vec<Permission>>>,
}

impl MemoryRoleDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_role(&self, name: &str, permissions: Vec<Permission>) {
        let mut roles = self.roles.write().await;
        roles.insert(name.to_string(), permissions);
    }

    pub async fn remove_role(&self, name: &str) {
        let mut roles = self.roles.write().await;
        roles.remove(name);
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn role_permissions(
        &self,
        _tenant_id: Option<Uuid>,
        role: &str,
    ) -> Result<Option<Vec<Permission>>> {
        let roles = self.roles.read().await;
        Ok(roles.get(role).cloned())
    }
}

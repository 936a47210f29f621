//! Durable session storage. The store is the source of truth for revocation;
//! the cache in front of it is an optimization.

use super::model::SessionRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, record: &SessionRecord) -> Result<()>;
    /// Lookups are scoped to the token's user so a stolen token cannot be
    /// probed across accounts.
    async fn find_by_token(&self, user_id: Uuid, token: &str) -> Result<Option<SessionRecord>>;
    /// Returns the number of sessions removed (0 or 1; deletes are
    /// idempotent).
    async fn delete_by_token(&self, user_id: Uuid, token: &str) -> Result<u64>;
    /// Drop all sessions that have passed their expiry.
    async fn purge_expired(&self) -> Result<u64>;
    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<SessionRecord> {
    let snapshot: String = row.get("user_snapshot");
    let user = serde_json::from_str(&snapshot).context("undecodable user snapshot")?;
    Ok(SessionRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tenant_id: row.get("tenant_id"),
        token: row.get("token"),
        user,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        let query = r"
            INSERT INTO sessions (id, user_id, tenant_id, token, user_snapshot, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let snapshot =
            serde_json::to_string(&record.user).context("failed to encode user snapshot")?;
        sqlx::query(query)
            .bind(record.id)
            .bind(record.user_id)
            .bind(record.tenant_id)
            .bind(&record.token)
            .bind(snapshot)
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn find_by_token(&self, user_id: Uuid, token: &str) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT id, user_id, tenant_id, token, user_snapshot::text AS user_snapshot,
                   created_at, expires_at
            FROM sessions
            WHERE user_id = $1 AND token = $2
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch session")?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete_by_token(&self, user_id: Uuid, token: &str) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE user_id = $1 AND token = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE expires_at <= now()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        sqlx::Connection::ping(&mut *conn)
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

/// Sweep expired sessions on a fixed interval. Spawned once at server
/// startup; runs until the task is dropped. Failures are logged and the next
/// tick retries.
pub async fn purge_expired_periodically(store: Arc<dyn SessionStore>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match store.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "purged expired sessions"),
            Err(err) => warn!(error = %err, "failed to purge expired sessions"),
        }
    }
}

/// In-memory store for tests and single-node setups.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<(Uuid, String), SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert((record.user_id, record.token.clone()), record.clone());
        Ok(())
    }

    async fn find_by_token(&self, user_id: Uuid, token: &str) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(user_id, token.to_string())).cloned())
    }

    async fn delete_by_token(&self, user_id: Uuid, token: &str) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        Ok(u64::from(
            sessions.remove(&(user_id, token.to_string())).is_some(),
        ))
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::SessionUser;
    use chrono::{Duration, Utc};

    fn record(user_id: Uuid, token: &str, ttl_minutes: i64) -> SessionRecord {
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
                permissions: vec![],
            },
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[tokio::test]
    async fn memory_store_scopes_lookups_to_user() -> Result<()> {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert(&record(user, "tok", 30)).await?;

        assert!(store.find_by_token(user, "tok").await?.is_some());
        assert!(store.find_by_token(other, "tok").await?.is_none());
        assert!(store.find_by_token(user, "nope").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<()> {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        store.insert(&record(user, "tok", 30)).await?;

        assert_eq!(store.delete_by_token(user, "tok").await?, 1);
        assert_eq!(store.delete_by_token(user, "tok").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() -> Result<()> {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        store.insert(&record(user, "live", 30)).await?;
        store.insert(&record(user, "dead", -5)).await?;

        assert_eq!(store.purge_expired().await?, 1);
        assert!(store.find_by_token(user, "live").await?.is_some());
        assert!(store.find_by_token(user, "dead").await?.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_purge_sweeps_expired_sessions() -> Result<()> {
        let store = Arc::new(MemorySessionStore::new());
        let user = Uuid::new_v4();
        store.insert(&record(user, "dead", -5)).await?;
        store.insert(&record(user, "live", 30)).await?;

        let sweeper = tokio::spawn(purge_expired_periodically(
            store.clone(),
            std::time::Duration::from_secs(60),
        ));
        // The first interval tick fires immediately.
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        assert!(store.find_by_token(user, "dead").await?.is_none());
        assert!(store.find_by_token(user, "live").await?.is_some());
        sweeper.abort();
        Ok(())
    }
}

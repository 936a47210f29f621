//! Distributed session cache in front of the session store.

use super::model::SessionRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

/// Tag under which all session entries are grouped, so a bulk revocation can
/// drop them in one pass.
pub const SESSION_TAG: &str = "Session";

/// Cache operations the resolver and login/logout paths need.
///
/// Implementations are best-effort by contract: callers treat errors as cache
/// misses and fall through to the store.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>>;
    async fn put(&self, record: &SessionRecord, ttl: Duration, tag: &str) -> Result<()>;
    async fn remove(&self, token: &str) -> Result<()>;
    /// Drop every entry registered under `tag`. Bulk-eviction hook for the
    /// admin tooling that mutates roles and tenants; no route in this
    /// service calls it.
    async fn invalidate_tag(&self, tag: &str) -> Result<()>;
    async fn ping(&self) -> Result<()>;
}

fn entry_key(token: &str) -> String {
    format!("session:{token}")
}

fn tag_key(tag: &str) -> String {
    format!("tag:{tag}")
}

/// Redis-backed cache. Entries are JSON blobs with a server-side TTL; tag
/// membership is a Redis set of entry keys.
pub struct RedisSessionCache {
    conn: ConnectionManager,
}

impl RedisSessionCache {
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(entry_key(token))
            .await
            .context("session cache read failed")?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                // An unreadable entry is a miss; the store refill replaces it.
                warn!(error = %err, "dropping undecodable session cache entry");
                let _: () = conn.del(entry_key(token)).await.unwrap_or(());
                Ok(None)
            }
        }
    }

    async fn put(&self, record: &SessionRecord, ttl: Duration, tag: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = entry_key(&record.token);
        let payload = serde_json::to_string(record).context("failed to encode session record")?;
        let () = conn
            .set_ex(&key, payload, ttl.as_secs())
            .await
            .context("session cache write failed")?;
        let () = conn
            .sadd(tag_key(tag), &key)
            .await
            .context("session tag update failed")?;
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = entry_key(token);
        let () = conn
            .del(&key)
            .await
            .context("session cache delete failed")?;
        let () = conn
            .srem(tag_key(SESSION_TAG), &key)
            .await
            .context("session tag cleanup failed")?;
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .smembers(tag_key(tag))
            .await
            .context("session tag read failed")?;
        if !keys.is_empty() {
            let () = conn
                .del(&keys)
                .await
                .context("session tag entries delete failed")?;
        }
        let () = conn
            .del(tag_key(tag))
            .await
            .context("session tag delete failed")?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("cache ping failed")?;
        anyhow::ensure!(pong == "PONG", "unexpected cache ping reply: {pong}");
        Ok(())
    }
}

/// In-memory cache for tests and single-node setups.
#[derive(Default)]
pub struct MemorySessionCache {
    entries: RwLock<HashMap<String, (SessionRecord, tokio::time::Instant)>>,
    tags: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemorySessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>> {
        let entries = self.entries.read().await;
        Ok(entries.get(token).and_then(|(record, deadline)| {
            (tokio::time::Instant::now() < *deadline).then(|| record.clone())
        }))
    }

    async fn put(&self, record: &SessionRecord, ttl: Duration, tag: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        entries.insert(record.token.clone(), (record.clone(), deadline));
        let mut tags = self.tags.write().await;
        tags.entry(tag.to_string())
            .or_default()
            .insert(record.token.clone());
        Ok(())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(token);
        let mut tags = self.tags.write().await;
        for members in tags.values_mut() {
            members.remove(token);
        }
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        let mut tags = self.tags.write().await;
        let Some(members) = tags.remove(tag) else {
            return Ok(());
        };
        let mut entries = self.entries.write().await;
        for token in members {
            entries.remove(&token);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

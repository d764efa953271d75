//! Viewed-set store
//!
//! Every picture a user has been shown, kept in one Redis set per user so
//! the state survives restarts and is shared by every worker process.
//!
//! `add` is the claim primitive: SADD reports whether the member was new,
//! and Redis executes it atomically, so two workers racing on the same id
//! can never both see `true`. No client-side lock is involved.

use crate::{CacheError, CacheKey, CacheResult, PictureId, StoreMetrics, UserId};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use redis_utils::RedisPool;
use resilience::with_timeout;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-user set of already delivered (or permanently explored) picture ids
#[async_trait::async_trait]
pub trait ViewedSetStore: Send + Sync {
    /// Whether `id` is in the user's set
    async fn contains(&self, user: UserId, id: PictureId) -> CacheResult<bool>;

    /// Atomic add-if-absent. `true` only for the caller that inserted it.
    async fn add(&self, user: UserId, id: PictureId) -> CacheResult<bool>;

    /// Remove `id`; no-op if absent
    async fn remove(&self, user: UserId, id: PictureId) -> CacheResult<()>;

    /// Remove and return an arbitrary member. Order is unspecified.
    async fn pop(&self, user: UserId) -> CacheResult<Option<PictureId>>;

    /// Drop the user's whole set
    async fn clear(&self, user: UserId) -> CacheResult<()>;

    /// Set cardinality
    async fn count(&self, user: UserId) -> CacheResult<u64>;
}

/// Redis-backed store, one SET per user
#[derive(Clone)]
pub struct RedisViewedSet {
    conn: ConnectionManager,
    namespace: Option<String>,
    op_timeout: Duration,
    metrics: StoreMetrics,
}

impl RedisViewedSet {
    pub fn new(pool: &RedisPool, op_timeout: Duration) -> Self {
        Self {
            conn: pool.manager(),
            namespace: None,
            op_timeout,
            metrics: StoreMetrics::new(),
        }
    }

    /// Prefix every key, e.g. to share one Redis between environments
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn key(&self, user: UserId) -> String {
        CacheKey::viewed_in(self.namespace.as_deref(), user)
    }

    /// Health check; the store is unusable until this succeeds
    pub async fn ping(&self) -> CacheResult<()> {
        let _: String = self
            .run("ping", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    /// Run one command on a cloned connection under the per-call timeout
    async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> CacheResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        match with_timeout(self.op_timeout, f(self.conn.clone())).await {
            Ok(Ok(value)) => {
                self.metrics.record_op(op);
                Ok(value)
            }
            Ok(Err(e)) => {
                warn!(op, error = %e, "Redis viewed-set command failed");
                self.metrics.record_error(op, "redis");
                Err(CacheError::Redis(e))
            }
            Err(elapsed) => {
                warn!(op, timeout = ?elapsed, "Redis viewed-set command timed out");
                self.metrics.record_error(op, "timeout");
                Err(CacheError::Timeout(elapsed))
            }
        }
    }
}

#[async_trait::async_trait]
impl ViewedSetStore for RedisViewedSet {
    async fn contains(&self, user: UserId, id: PictureId) -> CacheResult<bool> {
        let key = self.key(user);
        self.run("contains", move |mut conn| async move {
            conn.sismember(key, id.get()).await
        })
        .await
    }

    async fn add(&self, user: UserId, id: PictureId) -> CacheResult<bool> {
        let key = self.key(user);
        let added: i64 = self
            .run("add", move |mut conn| async move {
                conn.sadd(key, id.get()).await
            })
            .await?;

        let inserted = added == 1;
        self.metrics.record_claim(inserted);
        debug!(user = %user, picture_id = %id, inserted, "Viewed-set add");
        Ok(inserted)
    }

    async fn remove(&self, user: UserId, id: PictureId) -> CacheResult<()> {
        let key = self.key(user);
        let _: i64 = self
            .run("remove", move |mut conn| async move {
                conn.srem(key, id.get()).await
            })
            .await?;
        debug!(user = %user, picture_id = %id, "Viewed-set remove");
        Ok(())
    }

    async fn pop(&self, user: UserId) -> CacheResult<Option<PictureId>> {
        let key = self.key(user);
        let popped: Option<u64> = self
            .run("pop", move |mut conn| async move { conn.spop(key).await })
            .await?;
        Ok(popped.map(PictureId::new))
    }

    async fn clear(&self, user: UserId) -> CacheResult<()> {
        let key = self.key(user);
        let _: i64 = self
            .run("clear", move |mut conn| async move { conn.del(key).await })
            .await?;
        debug!(user = %user, "Viewed-set cleared");
        Ok(())
    }

    async fn count(&self, user: UserId) -> CacheResult<u64> {
        let key = self.key(user);
        self.run("count", move |mut conn| async move { conn.scard(key).await })
            .await
    }
}

/// In-process store for single-worker deployments and tests.
///
/// The DashMap entry lock makes `add` atomic for a user while other users'
/// shards stay available.
#[derive(Default)]
pub struct MemoryViewedSet {
    sets: DashMap<UserId, HashSet<PictureId>>,
}

impl MemoryViewedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's set
    pub fn with_viewed(self, user: UserId, ids: impl IntoIterator<Item = PictureId>) -> Self {
        self.sets.entry(user).or_default().extend(ids);
        self
    }
}

#[async_trait::async_trait]
impl ViewedSetStore for MemoryViewedSet {
    async fn contains(&self, user: UserId, id: PictureId) -> CacheResult<bool> {
        Ok(self
            .sets
            .get(&user)
            .map(|set| set.contains(&id))
            .unwrap_or(false))
    }

    async fn add(&self, user: UserId, id: PictureId) -> CacheResult<bool> {
        Ok(self.sets.entry(user).or_default().insert(id))
    }

    async fn remove(&self, user: UserId, id: PictureId) -> CacheResult<()> {
        if let Some(mut set) = self.sets.get_mut(&user) {
            set.remove(&id);
        }
        Ok(())
    }

    async fn pop(&self, user: UserId) -> CacheResult<Option<PictureId>> {
        let Some(mut set) = self.sets.get_mut(&user) else {
            return Ok(None);
        };
        let picked = set.iter().next().copied();
        if let Some(id) = picked {
            set.remove(&id);
        }
        Ok(picked)
    }

    async fn clear(&self, user: UserId) -> CacheResult<()> {
        self.sets.remove(&user);
        Ok(())
    }

    async fn count(&self, user: UserId) -> CacheResult<u64> {
        Ok(self
            .sets
            .get(&user)
            .map(|set| set.len() as u64)
            .unwrap_or(0))
    }
}

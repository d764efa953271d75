//! Recently viewed pictures per user
//!
//! Feeds the quick-pick buttons ("tags of a recent picture"). Not used for
//! dedup: losing it only loses the buttons. The snapshot is plain data so it
//! can be written at shutdown and replayed at startup.

use crate::{CacheError, CacheResult, PictureId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default number of recent ids kept per user
pub const DEFAULT_RECENT_CAPACITY: usize = 6;

/// Bounded, duplicate-suppressing recency list per user.
///
/// `list` returns ids most-recent-first. Each user's sequence is guarded by
/// its DashMap shard lock, so concurrent adds for one user never interleave.
pub struct RecencyCache {
    capacity: usize,
    entries: DashMap<UserId, VecDeque<PictureId>>,
}

impl RecencyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `id` as the most recent picture for `user`
    pub fn add(&self, user: UserId, id: PictureId) {
        let mut recent = self
            .entries
            .entry(user)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        if let Some(pos) = recent.iter().position(|&existing| existing == id) {
            recent.remove(pos);
        }
        recent.push_front(id);
        recent.truncate(self.capacity);
    }

    /// Most-recent-first; empty for unknown users
    pub fn list(&self, user: UserId) -> Vec<PictureId> {
        self.entries
            .get(&user)
            .map(|recent| recent.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of users with at least one recent id
    pub fn user_count(&self) -> usize {
        self.entries.len()
    }

    pub fn snapshot(&self) -> RecencySnapshot {
        let mut users: Vec<UserRecent> = self
            .entries
            .iter()
            .map(|entry| UserRecent {
                user: *entry.key(),
                recent: entry.value().iter().copied().collect(),
            })
            .collect();
        users.sort_by_key(|u| u.user);

        RecencySnapshot {
            schema_version: RecencySnapshot::CURRENT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            users,
        }
    }

    /// Merge a snapshot into this cache.
    ///
    /// Ids are replayed oldest-first so the restored order matches the saved
    /// one; anything beyond `capacity` falls off the old end.
    pub fn restore(&self, snapshot: RecencySnapshot) {
        for entry in snapshot.users {
            for id in entry.recent.into_iter().rev() {
                self.add(entry.user, id);
            }
        }
    }

    /// Load a snapshot written by [`RecencyCache::save_snapshot`].
    ///
    /// A missing file or an older schema yields an empty cache; a corrupt
    /// file is an error so the operator notices before it gets overwritten.
    pub async fn load_snapshot(path: impl AsRef<Path>, capacity: usize) -> CacheResult<Self> {
        let path = path.as_ref();
        let cache = Self::new(capacity);

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No recent-id snapshot, starting empty");
                return Ok(cache);
            }
            Err(e) => return Err(CacheError::Io(e)),
        };

        let snapshot: RecencySnapshot = serde_json::from_slice(&data)?;
        if snapshot.is_stale() {
            warn!(
                path = %path.display(),
                schema_version = snapshot.schema_version,
                "Ignoring recent-id snapshot with old schema"
            );
            return Ok(cache);
        }

        let users = snapshot.users.len();
        cache.restore(snapshot);
        info!(path = %path.display(), users, "Recent-id snapshot restored");
        Ok(cache)
    }

    /// Write the snapshot next to `path` and rename it into place
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> CacheResult<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let data = serde_json::to_vec_pretty(&snapshot)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, path).await?;

        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            "Recent-id snapshot saved"
        );
        Ok(())
    }
}

impl Default for RecencyCache {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

/// Serializable form of a [`RecencyCache`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencySnapshot {
    /// Schema version so old files can be skipped instead of misread
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub users: Vec<UserRecent>,
}

impl RecencySnapshot {
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    pub fn is_stale(&self) -> bool {
        self.schema_version < Self::CURRENT_SCHEMA_VERSION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecent {
    pub user: UserId,
    /// Most-recent-first
    pub recent: Vec<PictureId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<PictureId> {
        raw.iter().copied().map(PictureId::new).collect()
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let cache = RecencyCache::new(6);
        let user = UserId::new(1);
        for id in [10, 20, 30] {
            cache.add(user, PictureId::new(id));
        }
        assert_eq!(cache.list(user), ids(&[30, 20, 10]));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = RecencyCache::new(6);
        let user = UserId::new(1);
        for id in 1..=7 {
            cache.add(user, PictureId::new(id));
        }
        assert_eq!(cache.list(user), ids(&[7, 6, 5, 4, 3, 2]));
    }

    #[test]
    fn test_readd_moves_to_front_without_growing() {
        let cache = RecencyCache::new(3);
        let user = UserId::new(1);
        for id in [1, 2, 3] {
            cache.add(user, PictureId::new(id));
        }
        cache.add(user, PictureId::new(1));
        assert_eq!(cache.list(user), ids(&[1, 3, 2]));

        // 2 is now the oldest and goes first
        cache.add(user, PictureId::new(4));
        assert_eq!(cache.list(user), ids(&[4, 1, 3]));
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let cache = RecencyCache::default();
        assert!(cache.list(UserId::new(99)).is_empty());
        assert_eq!(cache.user_count(), 0);
    }

    #[test]
    fn test_users_are_independent() {
        let cache = RecencyCache::new(2);
        cache.add(UserId::new(1), PictureId::new(5));
        cache.add(UserId::new(2), PictureId::new(6));
        assert_eq!(cache.list(UserId::new(1)), ids(&[5]));
        assert_eq!(cache.list(UserId::new(2)), ids(&[6]));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = RecencyCache::new(0);
        cache.add(UserId::new(1), PictureId::new(5));
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.list(UserId::new(1)), ids(&[5]));
    }

    #[test]
    fn test_snapshot_restore_preserves_order() {
        let cache = RecencyCache::new(4);
        let user = UserId::new(-77);
        for id in [3, 1, 4, 1, 5] {
            cache.add(user, PictureId::new(id));
        }
        let snapshot = cache.snapshot();

        let restored = RecencyCache::new(4);
        restored.restore(snapshot);
        assert_eq!(restored.list(user), cache.list(user));
        assert_eq!(restored.list(user), ids(&[5, 1, 4, 3]));
    }

    #[test]
    fn test_restore_into_smaller_capacity_keeps_newest() {
        let cache = RecencyCache::new(6);
        let user = UserId::new(1);
        for id in 1..=6 {
            cache.add(user, PictureId::new(id));
        }

        let smaller = RecencyCache::new(2);
        smaller.restore(cache.snapshot());
        assert_eq!(smaller.list(user), ids(&[6, 5]));
    }

    #[test]
    fn test_stale_snapshot_schema() {
        let snapshot = RecencySnapshot {
            schema_version: 0,
            saved_at: Utc::now(),
            users: vec![],
        };
        assert!(snapshot.is_stale());
    }
}

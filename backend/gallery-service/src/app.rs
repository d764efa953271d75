//! Service assembly and lifecycle
//!
//! Wires configuration, Redis, the recency snapshot and a content source
//! into one [`PictureSampler`]. The command layer holds a `Gallery` and
//! calls `shutdown` on exit so recent ids survive a restart.

use crate::config::GalleryConfig;
use crate::error::Result;
use crate::models::Picture;
use crate::sampler::PictureSampler;
use crate::source::{CachedContentSource, ContentSource};
use anyhow::Context;
use gallery_cache::{PictureId, RecencyCache, RedisViewedSet, UserId, ViewedSetStore};
use redis_utils::RedisPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct Gallery {
    sampler: Arc<PictureSampler>,
    recent: Arc<RecencyCache>,
    snapshot_path: PathBuf,
}

impl Gallery {
    /// Connect to Redis and build the service around `source`.
    ///
    /// Fails if Redis stays unreachable: without the viewed sets every
    /// user would start seeing repeats.
    pub async fn connect<S>(config: &GalleryConfig, source: S) -> anyhow::Result<Self>
    where
        S: ContentSource + 'static,
    {
        let pool = match &config.redis.url {
            Some(url) => RedisPool::connect(url).await?,
            None => {
                RedisPool::connect_with_retry(
                    &config.redis_endpoint(),
                    CONNECT_ATTEMPTS,
                    CONNECT_DELAY,
                )
                .await?
            }
        };

        let mut viewed = RedisViewedSet::new(&pool, config.store_timeout());
        if let Some(namespace) = &config.redis.namespace {
            viewed = viewed.with_namespace(namespace.clone());
        }
        viewed
            .ping()
            .await
            .with_context(|| format!("viewed-set store at {} did not answer PING", pool.label()))?;

        Self::assemble(config, source, Arc::new(viewed)).await
    }

    /// Build the service around an already constructed viewed-set store
    pub async fn assemble<S>(
        config: &GalleryConfig,
        source: S,
        viewed: Arc<dyn ViewedSetStore>,
    ) -> anyhow::Result<Self>
    where
        S: ContentSource + 'static,
    {
        let snapshot_path = config.snapshot.path.clone();
        let recent = RecencyCache::load_snapshot(&snapshot_path, config.sampler.recent_capacity)
            .await
            .with_context(|| format!("failed to load recency snapshot {}", snapshot_path.display()))?;
        let recent = Arc::new(recent);

        let source = CachedContentSource::new(source, config.sampler.picture_cache_size);
        let sampler = PictureSampler::new(
            Arc::new(source),
            viewed,
            recent.clone(),
            config.sampler_config(),
        );

        info!(
            env = %config.app.env,
            max_id = config.sampler.max_id,
            draw_budget = config.sampler.draw_budget,
            restored_users = recent.user_count(),
            "Gallery ready"
        );

        Ok(Self {
            sampler: Arc::new(sampler),
            recent,
            snapshot_path,
        })
    }

    pub fn sampler(&self) -> Arc<PictureSampler> {
        self.sampler.clone()
    }

    pub fn recent(&self) -> &RecencyCache {
        &self.recent
    }

    /// Safe-only selection, for chats where explicit content is not allowed
    pub async fn safe_picture(
        &self,
        user: UserId,
        tags: Option<&[String]>,
        explicit_id: Option<PictureId>,
    ) -> Result<Picture> {
        self.sampler
            .select_picture(user, tags, explicit_id, true)
            .await
    }

    /// Selection with every rating allowed
    pub async fn any_picture(
        &self,
        user: UserId,
        tags: Option<&[String]>,
        explicit_id: Option<PictureId>,
    ) -> Result<Picture> {
        self.sampler
            .select_picture(user, tags, explicit_id, false)
            .await
    }

    /// Persist recent ids. Errors are logged, not returned: losing the
    /// quick-pick list must not block shutdown.
    pub async fn shutdown(&self) {
        match self.recent.save_snapshot(&self.snapshot_path).await {
            Ok(()) => info!(
                path = %self.snapshot_path.display(),
                users = self.recent.user_count(),
                "Recency snapshot saved"
            ),
            Err(e) => warn!(
                path = %self.snapshot_path.display(),
                error = %e,
                "Failed to save recency snapshot"
            ),
        }
    }
}

//! Non-repeating picture selection
//!
//! Selection order for a request without an explicit id:
//!
//! ```text
//! candidates (tag query page, or the latest picture)
//!     │  first one that passes the safety filter AND wins the SADD claim
//!     ▼
//! random draws over [1, max_id]
//!     │  claim → fetch → keep (missing) / release (filtered, failed) / deliver
//!     ▼
//! exhausted → clear the user's viewed set → run both steps once more
//!     ▼
//! NoContentAvailable
//! ```
//!
//! A pass only counts as exhausted when every draw got a real answer (seen,
//! missing, filtered). If the content source or the store failed along the
//! way the error is returned instead and the viewed set is left alone.
//!
//! The claim (`ViewedSetStore::add`) happens before the fetch, so two
//! requests for the same user that draw the same id cannot both deliver it.
//! Dropping the returned future abandons the remaining draws; claims
//! already written stay, which only marks those ids as explored.

use crate::error::{Result, SamplerError, SourceError};
use crate::metrics::SamplerMetrics;
use crate::models::Picture;
use crate::source::ContentSource;
use gallery_cache::{CacheError, CacheResult, PictureId, RecencyCache, UserId, ViewedSetStore};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resilience::{with_retry, with_retry_if, with_timeout, RetryConfig, RetryError, ServiceConfig};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for [`PictureSampler`]
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Highest id the board is known to have handed out
    pub max_id: u64,
    /// Tag query page size; candidates beyond it are ignored
    pub page_size: usize,
    /// Random draws allowed per pass before the space counts as exhausted
    pub draw_budget: u32,
    /// Timeout and retry for content source calls
    pub source: ServiceConfig,
    /// Retry for viewed-set calls (the store applies its own timeout)
    pub store_retry: RetryConfig,
    /// Fixed RNG seed, for reproducible draws in tests
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_id: 5_000_000,
            page_size: 200,
            draw_budget: 300,
            source: resilience::content_source_config(),
            store_retry: resilience::redis_config().retry,
            seed: None,
        }
    }
}

/// Picks pictures a user has not seen yet.
///
/// One instance serves every user; per-user state lives in the injected
/// stores.
pub struct PictureSampler {
    source: Arc<dyn ContentSource>,
    viewed: Arc<dyn ViewedSetStore>,
    recent: Arc<RecencyCache>,
    config: SamplerConfig,
    rng: Mutex<StdRng>,
    metrics: SamplerMetrics,
}

impl PictureSampler {
    pub fn new(
        source: Arc<dyn ContentSource>,
        viewed: Arc<dyn ViewedSetStore>,
        recent: Arc<RecencyCache>,
        mut config: SamplerConfig,
    ) -> Self {
        config.max_id = config.max_id.max(1);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            source,
            viewed,
            recent,
            config,
            rng: Mutex::new(rng),
            metrics: SamplerMetrics::new(),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Select one picture for `user` and record it as viewed.
    ///
    /// With `explicit_id` the dedup check is bypassed: the user asked for
    /// that picture. Otherwise `tags` (empty counts as none) picks between
    /// tag mode and latest mode.
    pub async fn select_picture(
        &self,
        user: UserId,
        tags: Option<&[String]>,
        explicit_id: Option<PictureId>,
        safe_only: bool,
    ) -> Result<Picture> {
        let picture = match explicit_id {
            Some(id) => self.select_explicit(user, id, safe_only).await?,
            None => {
                let tags = tags.filter(|tags| !tags.is_empty());
                self.select_unseen(user, tags, safe_only).await?
            }
        };

        self.recent.add(user, picture.id);
        Ok(picture)
    }

    /// Most-recent-first ids for quick-pick buttons
    pub fn recently_viewed(&self, user: UserId) -> Vec<PictureId> {
        self.recent.list(user)
    }

    /// Tags of one picture. Read-only: nothing is marked viewed.
    pub async fn picture_tags(&self, id: PictureId) -> Result<Vec<String>> {
        match self.fetch(id).await? {
            Some(picture) => Ok(picture.tags),
            None => Err(SamplerError::NotFound(id)),
        }
    }

    async fn select_explicit(&self, user: UserId, id: PictureId, safe_only: bool) -> Result<Picture> {
        let picture = self.fetch(id).await?.ok_or(SamplerError::NotFound(id))?;
        if !picture.allowed(safe_only) {
            debug!(user = %user, picture_id = %id, rating = %picture.rating, "Explicit id filtered");
            return Err(SamplerError::Filtered(id));
        }

        let inserted = self
            .claim(user, id)
            .await
            .map_err(SamplerError::StorageUnavailable)?;
        info!(user = %user, picture_id = %id, already_viewed = !inserted, "Delivering explicit picture");
        self.metrics.record_delivery("explicit");
        Ok(picture)
    }

    async fn select_unseen(
        &self,
        user: UserId,
        tags: Option<&[String]>,
        safe_only: bool,
    ) -> Result<Picture> {
        let candidates = self.candidates(tags).await?;
        let mode = if tags.is_some() { "tags" } else { "latest" };

        if let Some(picture) = self.select_pass(user, &candidates, safe_only, mode).await? {
            return Ok(picture);
        }

        warn!(
            user = %user,
            ?tags,
            safe_only,
            "No unseen picture left, resetting viewed set"
        );
        self.metrics.record_exhaustion();
        self.store(|| self.viewed.clear(user))
            .await
            .map_err(SamplerError::StorageUnavailable)?;

        if let Some(picture) = self.select_pass(user, &candidates, safe_only, mode).await? {
            return Ok(picture);
        }

        warn!(
            user = %user,
            ?tags,
            safe_only,
            draw_budget = self.config.draw_budget,
            "No acceptable picture even after reset"
        );
        Err(SamplerError::NoContentAvailable)
    }

    /// Candidates first, then random draws
    async fn select_pass(
        &self,
        user: UserId,
        candidates: &[Picture],
        safe_only: bool,
        mode: &'static str,
    ) -> Result<Option<Picture>> {
        if let Some(picture) = self.first_unseen(user, candidates, safe_only).await? {
            info!(user = %user, picture_id = %picture.id, mode, "Delivering candidate picture");
            self.metrics.record_delivery(mode);
            return Ok(Some(picture));
        }

        let drawn = self.draw_unseen(user, safe_only).await?;
        if let Some(picture) = &drawn {
            info!(user = %user, picture_id = %picture.id, "Delivering drawn picture");
            self.metrics.record_delivery("draw");
        }
        Ok(drawn)
    }

    async fn candidates(&self, tags: Option<&[String]>) -> Result<Vec<Picture>> {
        let page_size = self.config.page_size;
        match tags {
            Some(tags) => {
                let found = self
                    .source_call(|| self.source.get_by_tags(tags, page_size))
                    .await
                    .map_err(SamplerError::TransientSourceError)?;
                if found.is_empty() {
                    return Err(SamplerError::TagQueryEmpty(tags.to_vec()));
                }
                Ok(distinct(found, page_size))
            }
            None => match self.source_call(|| self.source.latest()).await {
                Ok(latest) => Ok(latest.into_iter().collect()),
                Err(e) => {
                    // Latest is only a shortcut; the draws below still work
                    warn!(error = %e, "Latest picture unavailable, drawing instead");
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn first_unseen(
        &self,
        user: UserId,
        candidates: &[Picture],
        safe_only: bool,
    ) -> Result<Option<Picture>> {
        for picture in candidates {
            // Filter before claiming so a filtered id stays eligible elsewhere
            if !picture.allowed(safe_only) {
                continue;
            }
            let claimed = self
                .claim(user, picture.id)
                .await
                .map_err(SamplerError::StorageUnavailable)?;
            if claimed {
                return Ok(Some(picture.clone()));
            }
        }
        Ok(None)
    }

    /// Rejection sampling over `[1, max_id]`, bounded by the draw budget
    async fn draw_unseen(&self, user: UserId, safe_only: bool) -> Result<Option<Picture>> {
        let viewed = self
            .store(|| self.viewed.count(user))
            .await
            .map_err(SamplerError::StorageUnavailable)?;
        if viewed >= self.config.max_id {
            debug!(user = %user, viewed, max_id = self.config.max_id, "Viewed set covers the id space");
            return Ok(None);
        }

        let mut storage_failures = 0;
        let mut last_storage_error = None;
        let mut last_source_error = None;

        for attempt in 1..=self.config.draw_budget {
            let id = self.draw_id();

            let claimed = match self.claim(user, id).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    debug!(user = %user, picture_id = %id, error = %e, "Claim failed");
                    self.metrics.record_draw("storage_error");
                    storage_failures += 1;
                    last_storage_error = Some(e);
                    continue;
                }
            };
            if !claimed {
                self.metrics.record_draw("seen");
                continue;
            }

            match self.source_call(|| self.source.get_by_id(id)).await {
                Ok(Some(picture)) if picture.allowed(safe_only) => {
                    debug!(user = %user, picture_id = %id, attempt, "Draw accepted");
                    self.metrics.record_draw("delivered");
                    return Ok(Some(picture));
                }
                Ok(Some(_)) => {
                    self.metrics.record_draw("filtered");
                    self.release(user, id).await;
                }
                Ok(None) => {
                    // Missing ids stay claimed: nothing will ever be there
                    self.metrics.record_draw("missing");
                }
                Err(e) => {
                    debug!(user = %user, picture_id = %id, error = %e, "Draw fetch failed");
                    self.metrics.record_draw("source_error");
                    self.release(user, id).await;
                    last_source_error = Some(e);
                }
            }
        }

        // A budget spent on failures says nothing about the id space
        if let Some(e) = last_source_error {
            warn!(user = %user, error = %e, "Draws hit content source errors, not resetting");
            return Err(SamplerError::TransientSourceError(e));
        }
        if let Some(e) = last_storage_error {
            warn!(user = %user, storage_failures, error = %e, "Draws hit storage errors, not resetting");
            return Err(SamplerError::StorageUnavailable(e));
        }
        debug!(user = %user, budget = self.config.draw_budget, "Draw budget spent");
        Ok(None)
    }

    fn draw_id(&self) -> PictureId {
        let raw = self.rng.lock().gen_range(1..=self.config.max_id);
        PictureId::new(raw)
    }

    /// Atomic add-if-absent, attempted once.
    ///
    /// SADD is not retried: when its reply is lost the insert may still have
    /// landed, and a second SADD would report `false` for our own claim.
    /// After a transient failure membership is read back instead; an id that
    /// is present now was claimed by this call unless another request for
    /// the same user drew the same id in that window.
    async fn claim(&self, user: UserId, id: PictureId) -> CacheResult<bool> {
        match self.viewed.add(user, id).await {
            Ok(inserted) => Ok(inserted),
            Err(e) if e.is_transient() => {
                warn!(user = %user, picture_id = %id, error = %e, "Claim reply lost, reading back");
                match self.store(|| self.viewed.contains(user, id)).await {
                    Ok(landed) => Ok(landed),
                    Err(_) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Give a claimed id back so it stays eligible under another policy
    async fn release(&self, user: UserId, id: PictureId) {
        if let Err(e) = self.store(|| self.viewed.remove(user, id)).await {
            warn!(user = %user, picture_id = %id, error = %e, "Could not release claim");
        }
    }

    async fn fetch(&self, id: PictureId) -> Result<Option<Picture>> {
        self.source_call(|| self.source.get_by_id(id))
            .await
            .map_err(SamplerError::TransientSourceError)
    }

    /// Content source call with per-attempt timeout and bounded retry
    async fn source_call<T, F, Fut>(&self, mut call: F) -> std::result::Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, SourceError>>,
    {
        let deadline = self.config.source.timeout.duration;
        with_retry(self.config.source.retry.clone(), || {
            let pending = call();
            async move {
                match with_timeout(deadline, pending).await {
                    Ok(result) => result,
                    Err(elapsed) => Err(SourceError::Timeout(elapsed)),
                }
            }
        })
        .await
        .map_err(RetryError::into_last)
    }

    /// Viewed-set call with bounded retry on transient errors only.
    /// Never used for `add`; see [`PictureSampler::claim`].
    async fn store<T, F, Fut>(&self, call: F) -> CacheResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        with_retry_if(self.config.store_retry.clone(), CacheError::is_transient, call)
            .await
            .map_err(RetryError::into_last)
    }
}

/// Drop repeated ids, keeping first occurrences, capped at `limit`
fn distinct(pictures: Vec<Picture>, limit: usize) -> Vec<Picture> {
    let mut seen = HashSet::new();
    pictures
        .into_iter()
        .filter(|picture| seen.insert(picture.id))
        .take(limit)
        .collect()
}

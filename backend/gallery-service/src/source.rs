//! Content source boundary
//!
//! The board API client lives outside this crate; the sampler only sees
//! this trait. `CachedContentSource` fronts any implementation with a
//! bounded LRU of picture metadata so repeated lookups (explicit ids, tag
//! lookups on recent pictures) do not hit the remote API again.

use crate::error::SourceError;
use crate::models::Picture;
use gallery_cache::PictureId;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::debug;

/// Remote picture metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// `Ok(None)` when no picture has this id
    async fn get_by_id(&self, id: PictureId) -> Result<Option<Picture>, SourceError>;

    /// Pictures matching every tag, newest first, at most `page_size`
    async fn get_by_tags(
        &self,
        tags: &[String],
        page_size: usize,
    ) -> Result<Vec<Picture>, SourceError>;

    /// The most recently posted picture
    async fn latest(&self) -> Result<Option<Picture>, SourceError>;
}

/// LRU cache of picture metadata in front of another source.
///
/// Only hits are cached; absent ids and failures always go to the inner
/// source so a transient error is never remembered.
pub struct CachedContentSource<S> {
    inner: S,
    cache: Mutex<LruCache<PictureId, Picture>>,
}

impl<S: ContentSource> CachedContentSource<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn remember<'a>(&self, pictures: impl IntoIterator<Item = &'a Picture>) {
        let mut cache = self.cache.lock();
        for picture in pictures {
            cache.put(picture.id, picture.clone());
        }
    }
}

#[async_trait::async_trait]
impl<S: ContentSource> ContentSource for CachedContentSource<S> {
    async fn get_by_id(&self, id: PictureId) -> Result<Option<Picture>, SourceError> {
        let cached = self.cache.lock().get(&id).cloned();
        if let Some(picture) = cached {
            debug!(picture_id = %id, "Picture cache hit");
            return Ok(Some(picture));
        }

        let fetched = self.inner.get_by_id(id).await?;
        if let Some(picture) = &fetched {
            self.remember([picture]);
        }
        Ok(fetched)
    }

    async fn get_by_tags(
        &self,
        tags: &[String],
        page_size: usize,
    ) -> Result<Vec<Picture>, SourceError> {
        let pictures = self.inner.get_by_tags(tags, page_size).await?;
        self.remember(&pictures);
        Ok(pictures)
    }

    async fn latest(&self) -> Result<Option<Picture>, SourceError> {
        let latest = self.inner.latest().await?;
        if let Some(picture) = &latest {
            self.remember([picture]);
        }
        Ok(latest)
    }
}

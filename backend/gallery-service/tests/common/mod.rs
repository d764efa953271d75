//! Shared fixtures for gallery-service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use gallery_cache::{MemoryViewedSet, PictureId, RecencyCache};
use gallery_service::{ContentSource, Picture, PictureSampler, SafetyRating, SamplerConfig, SourceError};
use resilience::RetryConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn picture(id: u64, rating: SafetyRating) -> Picture {
    Picture {
        id: PictureId::new(id),
        rating,
        tags: vec![format!("tag_{}", id % 3), "solo".to_string()],
        file_url: format!("https://img.example/{}.png", id),
        sample_url: format!("https://img.example/sample_{}.jpg", id),
        source_url: String::new(),
        width: 800,
        height: 600,
    }
}

/// In-memory board: pictures by id, ordered tag results, optional latest
#[derive(Default)]
pub struct StubSource {
    pictures: HashMap<PictureId, Picture>,
    tagged: HashMap<String, Vec<PictureId>>,
    latest: Option<PictureId>,
    id_lookups: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every id in `ids` exists and is safe
    pub fn dense(ids: impl IntoIterator<Item = u64>) -> Self {
        Self::new().with_pictures(ids.into_iter().map(|id| picture(id, SafetyRating::Safe)))
    }

    pub fn with_pictures(mut self, pictures: impl IntoIterator<Item = Picture>) -> Self {
        for picture in pictures {
            self.pictures.insert(picture.id, picture);
        }
        self
    }

    /// Tag query result, in the given order (duplicates kept)
    pub fn with_tag(mut self, tag: &str, ids: &[u64]) -> Self {
        self.tagged
            .insert(tag.to_string(), ids.iter().copied().map(PictureId::new).collect());
        self
    }

    pub fn with_latest(mut self, id: u64) -> Self {
        self.latest = Some(PictureId::new(id));
        self
    }

    pub fn id_lookups(&self) -> usize {
        self.id_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn get_by_id(&self, id: PictureId) -> Result<Option<Picture>, SourceError> {
        self.id_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.pictures.get(&id).cloned())
    }

    async fn get_by_tags(&self, tags: &[String], page_size: usize) -> Result<Vec<Picture>, SourceError> {
        let Some(first) = tags.first() else {
            return Ok(Vec::new());
        };
        let ids = self.tagged.get(first).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.pictures.get(&id).cloned())
            .take(page_size)
            .collect())
    }

    async fn latest(&self) -> Result<Option<Picture>, SourceError> {
        Ok(self.latest.and_then(|id| self.pictures.get(&id).cloned()))
    }
}

pub fn test_config(max_id: u64, draw_budget: u32) -> SamplerConfig {
    SamplerConfig {
        max_id,
        page_size: 200,
        draw_budget,
        source: resilience::content_source_config().with_timeout(Duration::from_secs(1)),
        store_retry: RetryConfig::none(),
        seed: Some(20240601),
    }
}

pub struct Harness {
    pub sampler: Arc<PictureSampler>,
    pub viewed: Arc<MemoryViewedSet>,
    pub recent: Arc<RecencyCache>,
}

pub fn harness(source: StubSource, viewed: MemoryViewedSet, config: SamplerConfig) -> Harness {
    let viewed = Arc::new(viewed);
    let recent = Arc::new(RecencyCache::default());
    let sampler = PictureSampler::new(Arc::new(source), viewed.clone(), recent.clone(), config);
    Harness {
        sampler: Arc::new(sampler),
        viewed,
        recent,
    }
}

pub fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

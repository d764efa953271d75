//! Gallery dedup state
//!
//! Two per-user structures back the picture sampler:
//! - `ViewedSetStore`: every picture id a user was shown, durable in Redis,
//!   with an atomic add-if-absent claim
//! - `RecencyCache`: the last few ids per user for quick-pick buttons,
//!   in memory with an optional JSON snapshot
//!
//! Both are plain service objects; the caller owns them and passes them in.

mod error;
mod ids;
mod keys;
mod metrics;

pub mod recent;
pub mod viewed;

pub use error::{CacheError, CacheResult};
pub use ids::{ParsePictureIdError, PictureId, UserId};
pub use keys::{CacheKey, CACHE_VERSION};
pub use metrics::StoreMetrics;
pub use recent::{RecencyCache, RecencySnapshot, UserRecent, DEFAULT_RECENT_CAPACITY};
pub use viewed::{MemoryViewedSet, RedisViewedSet, ViewedSetStore};

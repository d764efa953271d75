//! Non-repeating picture sampling
//!
//! Hands chat users board pictures they have not seen before. Dedup state
//! lives in `gallery-cache`; this crate holds the selection algorithm, the
//! content source boundary and service wiring.

pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod sampler;
pub mod source;
pub mod telemetry;

pub use app::Gallery;
pub use config::{ConfigError, GalleryConfig, LogFormat};
pub use error::{Result, SamplerError, SourceError};
pub use models::{Picture, SafetyRating};
pub use sampler::{PictureSampler, SamplerConfig};
pub use source::{CachedContentSource, ContentSource};

pub use gallery_cache::{PictureId, UserId};

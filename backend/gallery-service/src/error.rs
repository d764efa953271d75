//! Error types surfaced by the sampler

use gallery_cache::{CacheError, PictureId};
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the content source. Always treated as transient:
/// the picture counts as absent for this attempt and is never marked viewed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("content source request failed: {0}")]
    Transient(String),

    #[error("content source timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of a selection that did not produce a picture.
///
/// Every variant is reportable to the chat; none is fatal to the process.
#[derive(Error, Debug)]
pub enum SamplerError {
    /// Explicit id has no backing picture
    #[error("id: {0} not found")]
    NotFound(PictureId),

    /// Explicit id exists but fails the safety policy
    #[error("id: {0} is not safe for this chat")]
    Filtered(PictureId),

    /// Candidates and draws exhausted, even after resetting the viewed set
    #[error("no unseen picture available")]
    NoContentAvailable,

    /// Tag query matched nothing
    #[error("tags {0:?} not found")]
    TagQueryEmpty(Vec<String>),

    #[error("content source unavailable: {0}")]
    TransientSourceError(#[source] SourceError),

    #[error("viewed-set storage unavailable: {0}")]
    StorageUnavailable(#[source] CacheError),
}

impl SamplerError {
    /// Whether the same request may succeed if simply repeated later
    pub fn is_retryable(&self) -> bool {
        match self {
            SamplerError::TransientSourceError(_) => true,
            SamplerError::StorageUnavailable(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SamplerError>;

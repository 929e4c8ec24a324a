use thiserror::Error;

use crate::models::ResourceClass;

/// All the ways things can go wrong in infrawatch
///
/// The feed itself only ever fails one way: `CollectionFailed`. Everything
/// after collection is pure and can't fail. The other variants belong to
/// the plumbing around the feed (config files, the cache, exports).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to collect {resource}: {reason}")]
    CollectionFailed {
        resource: ResourceClass,
        reason: String,
    },

    #[error("Invalid {resource} record {id}: {reason}")]
    InvalidRecord {
        resource: ResourceClass,
        id: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache operation failed: {0}")]
    CacheError(#[from] infrawatch_cache::CacheError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Fold any error raised while fetching `resource` into a collection failure
    pub fn into_collection_failure(self, resource: ResourceClass) -> Self {
        match self {
            Error::CollectionFailed { .. } => self,
            other => Error::CollectionFailed {
                resource,
                reason: other.to_string(),
            },
        }
    }

    pub fn is_collection_failure(&self) -> bool {
        matches!(self, Error::CollectionFailed { .. })
    }
}

//! Catalog error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to a catalog source.
///
/// The loader never surfaces these to callers; it records the message on the
/// result set and keeps the previous records.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog service error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("catalog fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("catalog source unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Whether re-issuing the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Transport(_) | CatalogError::Timeout(_) | CatalogError::Unavailable(_) => {
                true
            }
            CatalogError::Remote { .. } | CatalogError::Decode(_) => false,
        }
    }
}

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

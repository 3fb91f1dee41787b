use thiserror::Error;

/// Errors surfaced by the search/extraction pipeline.
///
/// Field-level extraction misses are deliberately absent from this taxonomy:
/// a field that cannot be extracted degrades to an empty value instead of
/// failing the operation.
#[derive(Debug, Error)]
pub enum FinderError {
    /// Rendering backend not configured for a call that needs it.
    #[error("rendering backend not configured: {0}")]
    Config(String),

    /// The site served a bot-verification challenge instead of content.
    /// Not retried here; callers may try again later.
    #[error("blocked by bot verification: {0}")]
    Blocked(String),

    /// A location name could not be resolved to an identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// A detail page reports the listing as removed or missing.
    #[error("listing removed: {0}")]
    Removed(String),

    /// Network or HTTP failure from either backend, surfaced verbatim.
    /// Covers error statuses and error bodies from the rendering backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body that should have been JSON was not.
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FinderError {
    fn from(err: reqwest::Error) -> Self {
        FinderError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;

//! Failure taxonomy for the generation pipeline and persistence adapter.
//!
//! Every fallible operation in the crate returns [`Error`]. The variants map
//! onto the HTTP surface in `server`: `Auth` → 401, `Validation` → 400,
//! `NotFound` → 404, `RateLimited` → 429, everything else → 5xx.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or rejected credential for an upstream service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Malformed caller input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The repository, branch, or stored document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream API signalled throttling. Retryable with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Repository host or model provider failure.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A chunk upload to the file store failed. Aborts the whole batch.
    #[error("chunk upload failed: {0}")]
    Upload(String),

    /// The vector store could not be created over the uploaded chunks.
    #[error("index creation failed: {0}")]
    IndexCreation(String),

    /// Model output failed to parse or validate against the block schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Persistence backend credential or configuration failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transient persistence backend failure. Caller may retry.
    #[error("transient storage error: {0}")]
    Transient(String),
}

impl Error {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited(_) | Error::Transient(_))
    }
}

//! Error taxonomy for the generation pipeline.
//!
//! Oracle failures and storage conflicts are recoverable by design: the
//! scheduler logs them and keeps going. Only sustained storage failure
//! escalates to a run abort.

use thiserror::Error;

/// Enrichment oracle failures. All variants route the affected subset to the
/// deterministic fallback path; none abort a batch or a run.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("oracle is disabled in configuration")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("oracle call timed out after {0} seconds")]
    Timeout(u64),

    #[error("oracle backend error: {0}")]
    Backend(String),

    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),

    #[error("oracle returned an empty response")]
    EmptyResponse,
}

/// Catalog failures. `Conflict` is benign (the record already exists);
/// `Storage` is recoverable per item but escalates when consecutive.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("record with the same source key already exists")]
    Conflict,

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_cause() {
        assert!(OracleError::Timeout(30).to_string().contains("30"));
        assert!(CatalogError::Storage("disk full".into())
            .to_string()
            .contains("disk full"));
    }
}

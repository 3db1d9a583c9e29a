//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: errors the CLI commands raise before handing off to `anyhow`
//! - Module-specific errors ([`StoreError`], `ImportError`, `ConfigError`)
//!   stay with their modules and reach `anyhow` directly
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use groove_import::error::{Error, Result, ResultExt};
//!
//! async fn open(url: &str) -> Result<SqliteStore> {
//!     let store = SqliteStore::connect(url).await.with_context("opening database")?;
//!     Ok(store)
//! }
//! ```

use std::path::PathBuf;

use crate::import::StoreError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Import store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, StoreError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Store(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/exports/POS_Songs.csv");
        assert!(err.to_string().contains("/exports/POS_Songs.csv"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::not_found("POS_Songs.csv").context("while importing songs");
        let msg = err.to_string();
        assert!(msg.contains("while importing songs"));
        assert!(msg.contains("POS_Songs.csv"));
    }

    #[test]
    fn test_sqlx_error_gets_context() {
        let result: std::result::Result<(), sqlx::Error> = Err(sqlx::Error::PoolClosed);
        let err = result.with_context("opening database groove.db").unwrap_err();
        assert!(matches!(&err, Error::WithContext { source, .. } if matches!(**source, Error::Database(_))));
        assert!(err.to_string().starts_with("opening database groove.db: "));
    }

    #[test]
    fn test_store_error_converts() {
        let err: Error = StoreError::Unavailable("pool closed".into()).into();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert!(err.to_string().contains("pool closed"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), StoreError> =
            Err(StoreError::Rejected("constraint".into()));
        let with_ctx = result.with_context("listing import logs");
        let msg = with_ctx.unwrap_err().to_string();
        assert!(msg.contains("listing import logs"));
        assert!(msg.contains("constraint"));
    }
}

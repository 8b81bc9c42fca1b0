//! Core Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A core error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A pipeline was asked to plan over zero sources. Whether that is fatal
    /// depends on the pipeline; the caller decides.
    #[display("no sources are eligible for this pipeline")]
    EmptySourceSet,
    /// A media item was constructed without either an audio or a video reference.
    #[display("media item has neither audio nor video")]
    NoCapability,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Planning is pure arithmetic over in-memory lists; the same input
        // always produces the same error.
        false
    }
}

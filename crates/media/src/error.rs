//! Media Error Types
//!
//! Errors raised by the collaborators that touch the outside world: external
//! tools, the filesystem and tag persistence.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The origin could not be resolved into items at all.
    #[display("source could not be resolved: {_0}")]
    Unresolvable(#[error(not(source))] String),
    /// A required executable is not installed or not on `PATH`.
    #[display("required tool not found: {_0}")]
    ToolNotFound(#[error(not(source))] String),
    /// An external tool ran but reported failure.
    #[display("{_0}")]
    ToolFailed(#[error(not(source))] String),
    /// A media file could not be inspected.
    #[display("cannot probe media: {}", _0.display())]
    Probe(#[error(not(source))] PathBuf),
    /// None of a track's inputs could be used.
    #[display("no readable inputs")]
    NoUsableInputs,
    /// A remote reference reached a step that needs a local file.
    #[display("not a local file: {_0}")]
    NotLocal(#[error(not(source))] String),
    /// Tags could not be written.
    #[display("cannot write tags: {}", _0.display())]
    Tag(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ToolFailed(_))
    }
}

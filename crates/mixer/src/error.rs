//! Error types for a mixing run.
//!
//! ### Fatal Errors
//! End the run; nothing after them is produced.
//! - [`ErrorKind::AllSourcesExhausted`]
//! - [`ErrorKind::OutputLocation`]
//! - [`ErrorKind::Scratch`]
//!
//! ### Per-Track Errors
//! - [`ErrorKind::Encode`] - the track is skipped, the run continues.

use derive_more::{Display, Error};
use rotamix_core::Pipeline;

/// A mixing error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mixing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No source is left that could feed the audio pipeline.
    #[display("no valid audio sources; nothing to mix")]
    AllSourcesExhausted,
    /// The versioned output directory could not be created.
    #[display("cannot create the output directory")]
    OutputLocation,
    /// The run's scratch directory could not be created.
    #[display("cannot create a scratch directory")]
    Scratch,
    /// Combining, tagging or finalizing one track failed.
    #[display("{pipeline} track {track:02} failed")]
    Encode { pipeline: Pipeline, track: usize },
}

impl ErrorKind {
    /// Returns `true` if the run cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Encode { .. })
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Encode { .. } | Self::Scratch)
    }
}

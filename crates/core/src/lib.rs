//! Source bookkeeping and rotation planning.
//!
//! Everything in this crate is synchronous and free of I/O: retrieval,
//! encoding and output handling live in the crates built on top of it.

mod error;
pub mod metadata;
pub mod pipeline;
pub mod rotation;
pub mod source;
pub mod track;
pub mod validate;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::metadata::{TrackMetadata, compose};
pub use crate::pipeline::{Pipeline, Selection, select};
pub use crate::rotation::{RotationPlan, Slot, plan};
pub use crate::source::{MediaItem, MediaRef, Origin, Source, SourceKind};
pub use crate::track::Track;
pub use crate::validate::{DropReason, Validation, validate};

mod cleanup;
pub mod error;
mod location;
mod sanitize;

pub use crate::cleanup::{CleanupCoordinator, CleanupReport};
pub use crate::location::OutputLocation;
pub use crate::sanitize::{MAX_NAME_CHARS, sanitize_album_name};

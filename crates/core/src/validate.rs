use crate::source::Source;
use derive_more::Display;

/// Why a source did not make it into planning.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The retrieval layer could not resolve the origin at all.
    #[display("could not be resolved: {_0}")]
    Unresolvable(String),
    /// The origin resolved, but to zero usable items.
    #[display("no items resolved")]
    NoItemsResolved,
}

/// Outcome of [`validate`]: surviving sources in their original order, plus
/// every dropped source and the reason it was dropped.
#[derive(Debug, Default)]
pub struct Validation {
    pub valid: Vec<Source>,
    pub dropped: Vec<(Source, DropReason)>,
}

/// Splits `sources` into non-empty (valid) and empty (dropped) sources.
///
/// Only the aggregate is inspected. Sources that lost some of their entries
/// during retrieval arrive here already shortened and are kept as long as one
/// item survived.
pub fn validate(sources: impl IntoIterator<Item = Source>) -> Validation {
    let mut validation = Validation::default();
    for source in sources {
        if source.is_empty() {
            tracing::warn!(source = source.index(), origin = %source.origin(), "Dropping source; no items resolved");
            validation.dropped.push((source, DropReason::NoItemsResolved));
        } else {
            validation.valid.push(source);
        }
    }
    validation
}

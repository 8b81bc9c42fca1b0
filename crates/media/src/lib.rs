//! External collaborators of a mixing run: retrieving origins, encoding
//! tracks and writing tags, plus discovery of the tools behind them.

mod cache;
mod encode;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retrieve;
mod tag;
mod tool;

pub use crate::cache::DownloadCache;
pub use crate::encode::{Encoder, EncoderHandle, FfmpegEncoder, NormalizationSpec, TrimPolicy};
pub use crate::retrieve::{
    DirectoryRetriever, Resolved, RetrieveOptions, Retriever, RetrieverHandle, RoutingRetriever, YtDlpRetriever,
};
pub use crate::tag::{Id3TagWriter, TagWriter, TagWriterHandle};
pub use crate::tool::Tool;

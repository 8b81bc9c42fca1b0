//! Turning origins into media items.
//!
//! A [`Retriever`] resolves one origin into its items in discovery order.
//! Entries that fail individually are counted, not reported as errors; only
//! an origin that cannot be resolved at all fails the call.

mod local;
mod remote;

pub use self::local::DirectoryRetriever;
pub use self::remote::YtDlpRetriever;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use rotamix_core::{MediaItem, Origin, SourceKind};
use std::path::Path;
use std::sync::Arc;

pub type RetrieverHandle = Arc<dyn Retriever + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Descend into subdirectories of local origins.
    pub recursive: bool,
    /// Also resolve video content.
    pub video: bool,
    /// List items without fetching them; remote items keep remote references.
    pub list_only: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub items: Vec<MediaItem>,
    /// Entries that were listed but could not be resolved.
    pub skipped: usize,
    /// Entries served from the download cache.
    pub cached: usize,
}

#[async_trait]
pub trait Retriever {
    /// Resolves `origin`. Anything fetched is written below `scratch`, which
    /// the caller owns and cleans up.
    async fn resolve(&self, origin: &Origin, options: &RetrieveOptions, scratch: &Path) -> Result<Resolved>;
}

/// Dispatches each origin to the retriever for its [`SourceKind`].
pub struct RoutingRetriever {
    local: RetrieverHandle,
    remote: Option<RetrieverHandle>,
}
impl RoutingRetriever {
    /// Without a remote retriever (no yt-dlp), remote origins are unresolvable.
    pub fn new(local: RetrieverHandle, remote: Option<RetrieverHandle>) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl Retriever for RoutingRetriever {
    async fn resolve(&self, origin: &Origin, options: &RetrieveOptions, scratch: &Path) -> Result<Resolved> {
        match (origin.kind(), &self.remote) {
            (SourceKind::LocalCollection, _) => self.local.resolve(origin, options, scratch).await,
            (SourceKind::RemoteCollection, Some(remote)) => remote.resolve(origin, options, scratch).await,
            (SourceKind::RemoteCollection, None) => {
                exn::bail!(ErrorKind::Unresolvable("yt-dlp is not available for remote sources".to_string()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Fixed(&'static str);

    #[async_trait]
    impl Retriever for Fixed {
        async fn resolve(&self, _: &Origin, _: &RetrieveOptions, _: &Path) -> Result<Resolved> {
            Ok(Resolved { items: vec![MediaItem::audio(PathBuf::from(self.0))], ..Resolved::default() })
        }
    }

    fn first_item(resolved: &Resolved) -> String {
        resolved.items[0].audio_ref().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let router = RoutingRetriever::new(Arc::new(Fixed("local.mp3")), Some(Arc::new(Fixed("remote.mp3"))));
        let options = RetrieveOptions::default();
        let local = router.resolve(&Origin::new("./music"), &options, Path::new("/tmp")).await.unwrap();
        let remote = router.resolve(&Origin::new("https://youtu.be/x"), &options, Path::new("/tmp")).await.unwrap();
        assert_eq!(first_item(&local), "local.mp3");
        assert_eq!(first_item(&remote), "remote.mp3");
    }

    #[tokio::test]
    async fn test_remote_without_retriever() {
        let router = RoutingRetriever::new(Arc::new(Fixed("local.mp3")), None);
        let origin = Origin::new("https://youtube.com/playlist?list=PL1");
        let err = router.resolve(&origin, &RetrieveOptions::default(), Path::new("/tmp")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Unresolvable(_)));
    }
}

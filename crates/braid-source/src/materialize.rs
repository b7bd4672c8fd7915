//! Turning source declarations into readable directories.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use braid_config::{SourceOrigin, SourceSpec};
use braid_vcs::{CacheError, GitCache, GitCacheKey};

use crate::SourceError;
use crate::scan::PageRecord;

/// A source's content as it exists on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedRoot {
    /// Top-level directory: the local path or the git checkout.
    pub filesystem_root: PathBuf,
    /// Content directory relative to `filesystem_root`; empty for the root.
    pub content_subpath: PathBuf,
    /// Whether the directory belongs to the git cache and may be deleted.
    pub is_cache_owned: bool,
}

impl MaterializedRoot {
    /// Root for a directory the project owns.
    pub fn local(path: PathBuf) -> Self {
        Self {
            filesystem_root: path,
            content_subpath: PathBuf::new(),
            is_cache_owned: false,
        }
    }

    /// Directory holding the pages.
    pub fn content_dir(&self) -> PathBuf {
        if self.content_subpath.as_os_str().is_empty() {
            self.filesystem_root.clone()
        } else {
            self.filesystem_root.join(&self.content_subpath)
        }
    }

    /// Whether edits under this root should trigger re-resolution.
    ///
    /// Cache-owned checkouts only change through an explicit refresh.
    pub fn is_watched(&self) -> bool {
        !self.is_cache_owned
    }

    /// Absolute path of a page's file.
    pub fn page_path(&self, page: &PageRecord) -> PathBuf {
        self.content_dir().join(&page.relative_path)
    }

    /// Raw bytes of a page.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn read(&self, page: &PageRecord) -> io::Result<Vec<u8>> {
        std::fs::read(self.page_path(page))
    }
}

/// Resolves [`SourceSpec`]s to [`MaterializedRoot`]s.
///
/// Git sources go through the shared [`GitCache`]. With refresh enabled,
/// each git key is fetched at most once per materializer.
#[derive(Debug)]
pub struct SourceMaterializer {
    cache: Arc<GitCache>,
    refresh: bool,
    refreshed: Mutex<HashSet<GitCacheKey>>,
}

impl SourceMaterializer {
    /// Create a materializer backed by `cache`.
    pub fn new(cache: Arc<GitCache>) -> Self {
        Self {
            cache,
            refresh: false,
            refreshed: Mutex::new(HashSet::new()),
        }
    }

    /// Fetch git sources even when a checkout already exists.
    #[must_use]
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The cache used for git sources.
    pub fn cache(&self) -> &Arc<GitCache> {
        &self.cache
    }

    /// Materialize one source.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::NotFound` for a missing directory,
    /// `SourceError::SubpathNotFound` when a git subpath is absent from the
    /// checkout, and `SourceError::Cache` when the checkout cannot be made.
    pub fn materialize(&self, spec: &SourceSpec) -> Result<MaterializedRoot, SourceError> {
        self.materialize_origin(&spec.origin)
    }

    /// Materialize a bare origin.
    ///
    /// # Errors
    ///
    /// Same as [`SourceMaterializer::materialize`].
    pub fn materialize_origin(&self, origin: &SourceOrigin) -> Result<MaterializedRoot, SourceError> {
        match origin {
            SourceOrigin::Local { path } | SourceOrigin::RemotePath { path } => {
                require_dir(path)?;
                let mut root = MaterializedRoot::local(path.clone());
                // Paths declared by a parent fetched through git point into its checkout.
                root.is_cache_owned = path.starts_with(self.cache.root());
                Ok(root)
            }
            SourceOrigin::RemoteGit {
                url,
                git_ref,
                subpath,
            } => {
                let key = GitCacheKey::new(url, git_ref.as_deref());
                let checkout = self.checkout(&key)?;
                let content_subpath = subpath.clone().unwrap_or_default();
                if !checkout.join(&content_subpath).is_dir() {
                    return Err(SourceError::SubpathNotFound {
                        url: url.clone(),
                        subpath: content_subpath,
                    });
                }
                Ok(MaterializedRoot {
                    filesystem_root: checkout,
                    content_subpath,
                    is_cache_owned: true,
                })
            }
        }
    }

    /// Ensure the checkout, purging and retrying once if it is dirty.
    fn checkout(&self, key: &GitCacheKey) -> Result<PathBuf, SourceError> {
        match self.fetch(key) {
            Err(CacheError::DirtyCache { path, reason }) => {
                tracing::warn!(
                    key = %key,
                    path = %path.display(),
                    reason = %reason,
                    "Cached checkout is unusable, purging and retrying"
                );
                self.cache.purge(key)?;
                Ok(self.fetch(key)?)
            }
            result => Ok(result?),
        }
    }

    fn fetch(&self, key: &GitCacheKey) -> Result<PathBuf, CacheError> {
        if self.refresh {
            let first = self
                .refreshed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone());
            if first {
                return self.cache.refresh(key);
            }
        }
        self.cache.ensure_key(key)
    }
}

fn require_dir(path: &Path) -> Result<(), SourceError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SourceError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_vcs::MockTransport;
    use std::fs;

    const URL: &str = "https://example.com/org/api";

    fn setup() -> (tempfile::TempDir, Arc<MockTransport>, SourceMaterializer) {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new().with_repo(
            URL,
            "main",
            &[("README.md", "# Api"), ("docs/index.md", "# Docs")],
        ));
        let cache = GitCache::with_transport(
            dir.path().join("cache"),
            Arc::clone(&transport) as Arc<dyn braid_vcs::GitTransport>,
        );
        (dir, transport, SourceMaterializer::new(Arc::new(cache)))
    }

    fn git(subpath: Option<&str>) -> SourceOrigin {
        SourceOrigin::RemoteGit {
            url: URL.to_owned(),
            git_ref: None,
            subpath: subpath.map(PathBuf::from),
        }
    }

    #[test]
    fn test_local_root() {
        let (dir, _, materializer) = setup();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();

        let root = materializer
            .materialize_origin(&SourceOrigin::Local { path: docs.clone() })
            .unwrap();

        assert_eq!(root, MaterializedRoot::local(docs.clone()));
        assert_eq!(root.content_dir(), docs);
        assert!(root.is_watched());
    }

    #[test]
    fn test_local_missing() {
        let (dir, _, materializer) = setup();
        let err = materializer
            .materialize_origin(&SourceOrigin::Local {
                path: dir.path().join("missing"),
            })
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn test_local_file_is_not_a_root() {
        let (dir, _, materializer) = setup();
        let file = dir.path().join("file.md");
        fs::write(&file, "x").unwrap();
        let err = materializer
            .materialize_origin(&SourceOrigin::RemotePath { path: file })
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn test_remote_path_is_not_cache_owned() {
        let (dir, transport, materializer) = setup();
        let root = materializer
            .materialize_origin(&SourceOrigin::RemotePath {
                path: dir.path().to_path_buf(),
            })
            .unwrap();
        assert!(!root.is_cache_owned);
        assert!(root.is_watched());
        assert_eq!(transport.fetch_count(), 0);
    }

    #[test]
    fn test_path_inside_cache_is_cache_owned() {
        let (_dir, _, materializer) = setup();
        let checkout = materializer.materialize_origin(&git(None)).unwrap();

        let root = materializer
            .materialize_origin(&SourceOrigin::Local {
                path: checkout.filesystem_root.join("docs"),
            })
            .unwrap();

        assert!(root.is_cache_owned);
        assert!(!root.is_watched());
    }

    #[test]
    fn test_git_root_with_subpath() {
        let (_dir, _, materializer) = setup();
        let root = materializer.materialize_origin(&git(Some("docs"))).unwrap();

        assert!(root.is_cache_owned);
        assert!(!root.is_watched());
        assert_eq!(root.content_subpath, PathBuf::from("docs"));
        assert!(root.content_dir().join("index.md").is_file());
    }

    #[test]
    fn test_git_missing_subpath() {
        let (_dir, _, materializer) = setup();
        let err = materializer.materialize_origin(&git(Some("nope"))).unwrap_err();
        assert!(matches!(err, SourceError::SubpathNotFound { ref subpath, .. } if subpath == Path::new("nope")));
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let (_dir, transport, materializer) = setup();
        let first = materializer.materialize_origin(&git(None)).unwrap();
        let second = materializer.materialize_origin(&git(Some("docs"))).unwrap();

        assert_eq!(first.filesystem_root, second.filesystem_root);
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn test_dirty_checkout_is_purged_and_retried() {
        let (_dir, transport, materializer) = setup();
        let key = GitCacheKey::new(URL, None);
        let checkout = materializer.cache().checkout_path(&key);
        fs::create_dir_all(&checkout).unwrap();
        fs::write(checkout.join("junk"), "x").unwrap();

        let root = materializer.materialize_origin(&git(None)).unwrap();

        assert!(root.filesystem_root.join("README.md").is_file());
        assert!(!root.filesystem_root.join("junk").exists());
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn test_refresh_fetches_once_per_key() {
        let (_dir, transport, materializer) = setup();
        materializer.materialize_origin(&git(None)).unwrap();
        let materializer = SourceMaterializer::new(Arc::clone(materializer.cache())).with_refresh(true);

        materializer.materialize_origin(&git(None)).unwrap();
        materializer.materialize_origin(&git(Some("docs"))).unwrap();

        assert_eq!(transport.fetch_count(), 2);
    }

    #[test]
    fn test_cache_error_is_wrapped() {
        let (_dir, _, materializer) = setup();
        let err = materializer
            .materialize_origin(&SourceOrigin::RemoteGit {
                url: "https://example.com/unknown".to_owned(),
                git_ref: None,
                subpath: None,
            })
            .unwrap_err();
        assert!(matches!(err, SourceError::Cache(CacheError::Unreachable { .. })));
    }
}

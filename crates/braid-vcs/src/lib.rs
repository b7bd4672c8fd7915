//! Git checkout cache for braid.
//!
//! [`GitCache`] keeps one checkout per [`GitCacheKey`] (normalized remote URL
//! plus ref) under a cache root:
//!
//! ```text
//! <cache root>/
//!   site-main-3f9a1c0d2b7e4a55/     one directory per key
//!   api-v2-0b1c2d3e4f5a6b7c/
//! ```
//!
//! The directory name depends only on the key, so a later process finds and
//! reuses an earlier clone, and deleting the cache root clears everything.
//!
//! Within a process, [`GitCache::ensure`] touches the network at most once per
//! key; later calls return the known path. [`GitCache::refresh`] is the only
//! way to fetch again. Operations on one key are serialized by an in-process
//! lock; distinct keys proceed in parallel.
//!
//! Network access goes through the [`GitTransport`] trait. [`Git2Transport`]
//! uses libgit2; [`MockTransport`] (behind the `mock` feature) serves
//! repositories from memory and counts fetches.

mod git;
mod key;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod transport;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub use git::Git2Transport;
pub use key::{DEFAULT_REF, GitCacheKey, normalize_url};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use transport::GitTransport;

/// Default network timeout for clone and fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Git cache error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Remote could not be reached, authenticated against, or timed out.
    #[error("Cannot reach {url}: {message}")]
    Unreachable {
        /// Remote URL.
        url: String,
        /// What went wrong.
        message: String,
    },
    /// Ref does not resolve in the remote.
    #[error("Ref '{git_ref}' not found in {url}")]
    RefNotFound {
        /// Remote URL.
        url: String,
        /// Requested ref.
        git_ref: String,
    },
    /// Existing cache directory is not a checkout of the expected remote.
    #[error("Cache directory {} is not usable: {reason}", path.display())]
    DirtyCache {
        /// Checkout path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// Filesystem error inside the cache root.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Cache of git checkouts.
///
/// Share it between sessions behind an [`Arc`]; it holds no global state.
pub struct GitCache {
    root: PathBuf,
    transport: Arc<dyn GitTransport>,
    timeout: Duration,
    /// Keys already ensured by this process.
    ensured: Mutex<HashSet<GitCacheKey>>,
    /// Per-key locks serializing clone, fetch and purge.
    locks: Mutex<HashMap<GitCacheKey, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for GitCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCache")
            .field("root", &self.root)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GitCache {
    /// Create a cache at `root` using libgit2.
    pub fn new(root: PathBuf) -> Self {
        Self::with_transport(root, Arc::new(Git2Transport))
    }

    /// Create a cache at `root` with a custom transport.
    pub fn with_transport(root: PathBuf, transport: Arc<dyn GitTransport>) -> Self {
        Self {
            root,
            transport,
            timeout: DEFAULT_TIMEOUT,
            ensured: Mutex::new(HashSet::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Set the network timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the checkout for `key` lives, whether or not it exists yet.
    pub fn checkout_path(&self, key: &GitCacheKey) -> PathBuf {
        self.root.join(key.dir_name())
    }

    /// Make sure a checkout of `url` at `git_ref` exists and return its path.
    ///
    /// # Errors
    ///
    /// See [`GitCache::ensure_key`].
    pub fn ensure(&self, url: &str, git_ref: Option<&str>) -> Result<PathBuf, CacheError> {
        self.ensure_key(&GitCacheKey::new(url, git_ref))
    }

    /// Make sure a checkout for `key` exists and return its path.
    ///
    /// Clones on first use. A checkout left by an earlier process is verified
    /// locally and reused. Once ensured, later calls return immediately.
    ///
    /// # Errors
    ///
    /// Returns `Unreachable` or `RefNotFound` if cloning fails, and
    /// `DirtyCache` if an existing directory is not a checkout of the remote.
    pub fn ensure_key(&self, key: &GitCacheKey) -> Result<PathBuf, CacheError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.checkout_path(key);
        if self.is_ensured(key) {
            return Ok(path);
        }

        if path.exists() {
            self.transport.verify(&path, key.normalized_url())?;
            tracing::debug!(key = %key, path = %path.display(), "Reusing cached checkout");
        } else {
            self.clone_into(key, &path)?;
        }

        self.mark_ensured(key);
        Ok(path)
    }

    /// Fetch the latest `key` ref into its checkout, cloning if absent.
    ///
    /// # Errors
    ///
    /// Same as [`GitCache::ensure_key`].
    pub fn refresh(&self, key: &GitCacheKey) -> Result<PathBuf, CacheError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.checkout_path(key);
        if path.exists() {
            self.transport.verify(&path, key.normalized_url())?;
            tracing::info!(key = %key, "Fetching");
            self.transport
                .fetch_checkout(&path, key.remote(), key.git_ref(), self.timeout)?;
        } else {
            self.clone_into(key, &path)?;
        }

        self.mark_ensured(key);
        Ok(path)
    }

    /// Remove the checkout for `key`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory cannot be removed.
    pub fn purge(&self, key: &GitCacheKey) -> Result<(), CacheError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        let path = self.checkout_path(key);
        remove_dir(&path)?;
        tracing::info!(key = %key, "Purged cached checkout");
        Ok(())
    }

    /// Remove the whole cache root.
    ///
    /// Must not run while a resolution session is using the cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the root cannot be removed.
    pub fn purge_all(&self) -> Result<(), CacheError> {
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        remove_dir(&self.root)?;
        tracing::info!(root = %self.root.display(), "Purged git cache");
        Ok(())
    }

    /// Checkout directories currently on disk, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the root exists but cannot be read.
    pub fn entries(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        let mut entries: Vec<PathBuf> = read
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.path())
            .collect();
        entries.sort();
        Ok(entries)
    }

    /// Clone into a hidden staging directory, then rename it into place.
    fn clone_into(&self, key: &GitCacheKey, path: &Path) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })?;
        let staging = self.root.join(format!(".tmp-{}", key.dir_name()));
        remove_dir(&staging)?;

        tracing::info!(key = %key, "Cloning");
        if let Err(e) = self
            .transport
            .clone_checkout(key.remote(), key.git_ref(), &staging, self.timeout)
        {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        fs::rename(&staging, path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn key_lock(&self, key: &GitCacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn is_ensured(&self, key: &GitCacheKey) -> bool {
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn mark_ensured(&self, key: &GitCacheKey) {
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
    }
}

fn remove_dir(path: &Path) -> Result<(), CacheError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Condvar;
    use std::thread;

    const URL: &str = "https://example.com/org/site.git";

    fn mock() -> Arc<MockTransport> {
        Arc::new(MockTransport::new().with_repo(URL, "main", &[("index.md", "# Home")]))
    }

    fn cache(root: &Path, transport: &Arc<MockTransport>) -> GitCache {
        GitCache::with_transport(root.to_path_buf(), Arc::clone(transport) as Arc<dyn GitTransport>)
    }

    #[test]
    fn test_ensure_twice_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);

        let first = cache.ensure(URL, None).unwrap();
        let second = cache.ensure(URL, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.fetch_count(), 1);
        assert_eq!(fs::read_to_string(first.join("index.md")).unwrap(), "# Home");
    }

    #[test]
    fn test_equivalent_urls_share_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);

        let a = cache.ensure(URL, Some("main")).unwrap();
        let b = cache.ensure("https://EXAMPLE.com/org/site/", None).unwrap();

        assert_eq!(a, b);
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn test_new_process_reuses_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();

        let first = cache(dir.path(), &transport).ensure(URL, None).unwrap();
        let second = cache(dir.path(), &transport).ensure(URL, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn test_refresh_fetches_again() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);
        let key = GitCacheKey::new(URL, None);

        let path = cache.ensure_key(&key).unwrap();
        transport.set_repo(URL, "main", &[("index.md", "# Home"), ("new.md", "# New")]);
        assert!(!path.join("new.md").exists());

        cache.refresh(&key).unwrap();

        assert!(path.join("new.md").exists());
        assert_eq!(transport.fetch_count(), 2);
    }

    #[test]
    fn test_unreachable_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);

        let err = cache.ensure("https://example.com/missing", None).unwrap_err();

        assert!(matches!(err, CacheError::Unreachable { .. }));
        assert_eq!(cache.entries().unwrap(), Vec::<PathBuf>::new());
    }

    #[test]
    fn test_ref_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);

        let err = cache.ensure(URL, Some("v9")).unwrap_err();

        assert!(matches!(err, CacheError::RefNotFound { ref git_ref, .. } if git_ref == "v9"));
    }

    #[test]
    fn test_dirty_cache_then_purge_and_retry() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);
        let key = GitCacheKey::new(URL, None);

        fs::create_dir_all(cache.checkout_path(&key)).unwrap();
        let err = cache.ensure_key(&key).unwrap_err();
        assert!(matches!(err, CacheError::DirtyCache { .. }));

        cache.purge(&key).unwrap();
        let path = cache.ensure_key(&key).unwrap();
        assert!(path.join("index.md").exists());
    }

    #[test]
    fn test_purge_forgets_ensured_key() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = cache(dir.path(), &transport);
        let key = GitCacheKey::new(URL, None);

        let path = cache.ensure_key(&key).unwrap();
        cache.purge(&key).unwrap();
        assert!(!path.exists());

        cache.ensure_key(&key).unwrap();
        assert_eq!(transport.fetch_count(), 2);
    }

    #[test]
    fn test_purge_all_removes_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let transport = mock();
        let cache = cache(&root, &transport);
        cache.ensure(URL, None).unwrap();
        assert_eq!(cache.entries().unwrap().len(), 1);

        cache.purge_all().unwrap();

        assert!(!root.exists());
        assert!(cache.entries().unwrap().is_empty());
        cache.purge_all().unwrap();
    }

    /// Transport whose clones wait, up to `patience`, until `expected`
    /// clones are in flight at once.
    struct Rendezvous {
        inner: MockTransport,
        expected: usize,
        patience: Duration,
        arrived: Mutex<usize>,
        all_in: Condvar,
    }

    impl Rendezvous {
        fn new(inner: MockTransport, expected: usize, patience: Duration) -> Self {
            Self {
                inner,
                expected,
                patience,
                arrived: Mutex::new(0),
                all_in: Condvar::new(),
            }
        }
    }

    impl GitTransport for Rendezvous {
        fn clone_checkout(
            &self,
            url: &str,
            git_ref: &str,
            dest: &Path,
            timeout: Duration,
        ) -> Result<(), CacheError> {
            let mut arrived = self.arrived.lock().unwrap();
            *arrived += 1;
            self.all_in.notify_all();
            let (arrived, waited) = self
                .all_in
                .wait_timeout_while(arrived, self.patience, |n| *n < self.expected)
                .unwrap();
            drop(arrived);
            if waited.timed_out() {
                return Err(CacheError::Unreachable {
                    url: url.to_owned(),
                    message: "clone ran alone".to_owned(),
                });
            }
            self.inner.clone_checkout(url, git_ref, dest, timeout)
        }

        fn fetch_checkout(
            &self,
            path: &Path,
            url: &str,
            git_ref: &str,
            timeout: Duration,
        ) -> Result<(), CacheError> {
            self.inner.fetch_checkout(path, url, git_ref, timeout)
        }

        fn verify(&self, path: &Path, expected_url: &str) -> Result<(), CacheError> {
            self.inner.verify(path, expected_url)
        }
    }

    #[test]
    fn test_distinct_keys_clone_in_parallel() {
        const OTHER: &str = "https://example.com/org/api";
        let dir = tempfile::tempdir().unwrap();
        let inner = MockTransport::new()
            .with_repo(URL, "main", &[("index.md", "# Home")])
            .with_repo(OTHER, "main", &[("index.md", "# API")]);
        let transport = Arc::new(Rendezvous::new(inner, 2, Duration::from_secs(10)));
        let cache = Arc::new(GitCache::with_transport(
            dir.path().to_path_buf(),
            transport as Arc<dyn GitTransport>,
        ));

        let handles: Vec<_> = [URL, OTHER]
            .into_iter()
            .map(|url| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ensure(url, None))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().all(Result::is_ok), "{results:?}");
        assert_eq!(cache.entries().unwrap().len(), 2);
    }

    #[test]
    fn test_same_key_clones_never_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let inner = MockTransport::new().with_repo(URL, "main", &[("index.md", "# Home")]);
        let transport = Arc::new(Rendezvous::new(inner, 2, Duration::from_millis(200)));
        let cache = Arc::new(GitCache::with_transport(
            dir.path().to_path_buf(),
            transport as Arc<dyn GitTransport>,
        ));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ensure(URL, None))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // The first clone waits alone and gives up; the second runs after it.
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert!(results.iter().any(Result::is_ok));
    }

    #[test]
    fn test_slow_remote_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            MockTransport::new()
                .with_repo(URL, "main", &[("index.md", "# Home")])
                .with_latency(Duration::from_secs(30)),
        );
        let cache = cache(dir.path(), &transport).with_timeout(Duration::from_millis(20));

        let err = cache.ensure(URL, None).unwrap_err();

        assert!(
            matches!(err, CacheError::Unreachable { ref message, .. } if message.contains("timed out")),
            "{err}"
        );
        assert!(cache.entries().unwrap().is_empty());
        assert_eq!(transport.fetch_count(), 0);
    }

    #[test]
    fn test_slow_remote_within_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            MockTransport::new()
                .with_repo(URL, "main", &[("index.md", "# Home")])
                .with_latency(Duration::from_millis(10)),
        );
        let cache = cache(dir.path(), &transport).with_timeout(Duration::from_secs(5));

        let path = cache.ensure(URL, None).unwrap();

        assert!(path.join("index.md").exists());
    }

    #[test]
    fn test_concurrent_ensure_same_key_clones_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = mock();
        let cache = Arc::new(cache(dir.path(), &transport));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ensure(URL, None).unwrap())
            })
            .collect();
        let paths: HashSet<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(paths.len(), 1);
        assert_eq!(transport.fetch_count(), 1);
    }
}

//! In-memory transport for tests.
//!
//! Provides [`MockTransport`], which serves repositories defined in memory,
//! counts every network operation and can simulate a slow remote.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use crate::key::normalize_url;
use crate::transport::GitTransport;
use crate::CacheError;

/// Marker written into every mock checkout, holding the origin URL.
const ORIGIN_MARKER: &str = ".mock-origin";

type Files = Vec<(String, String)>;

/// Mock transport for testing.
///
/// # Example
///
/// ```ignore
/// let transport = MockTransport::new()
///     .with_repo("https://example.com/site", "main", &[("index.md", "# Home")]);
/// let cache = GitCache::with_transport(root, Arc::new(transport));
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    repos: RwLock<HashMap<String, HashMap<String, Files>>>,
    fetches: AtomicUsize,
    latency: Duration,
}

impl MockTransport {
    /// Create a transport that serves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `files` for `url` at `git_ref`.
    #[must_use]
    pub fn with_repo(self, url: &str, git_ref: &str, files: &[(&str, &str)]) -> Self {
        self.set_repo(url, git_ref, files);
        self
    }

    /// Delay every clone and fetch by `latency`.
    ///
    /// Operations whose timeout is shorter than `latency` wait for the
    /// timeout and fail with `CacheError::Unreachable`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the files served for `url` at `git_ref`, as if pushed.
    pub fn set_repo(&self, url: &str, git_ref: &str, files: &[(&str, &str)]) {
        let files = files
            .iter()
            .map(|(p, c)| ((*p).to_owned(), (*c).to_owned()))
            .collect();
        self.repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(normalize_url(url))
            .or_default()
            .insert(git_ref.to_owned(), files);
    }

    /// Number of clones and fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn wait(&self, url: &str, timeout: Duration) -> Result<(), CacheError> {
        if self.latency > timeout {
            thread::sleep(timeout);
            return Err(CacheError::Unreachable {
                url: url.to_owned(),
                message: format!("timed out after {}ms", timeout.as_millis()),
            });
        }
        thread::sleep(self.latency);
        Ok(())
    }

    fn files(&self, url: &str, git_ref: &str) -> Result<Files, CacheError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let repos = self.repos.read().unwrap_or_else(PoisonError::into_inner);
        let refs = repos
            .get(&normalize_url(url))
            .ok_or_else(|| CacheError::Unreachable {
                url: url.to_owned(),
                message: "repository not found".to_owned(),
            })?;
        refs.get(git_ref)
            .cloned()
            .ok_or_else(|| CacheError::RefNotFound {
                url: url.to_owned(),
                git_ref: git_ref.to_owned(),
            })
    }
}

fn write_files(dest: &Path, url: &str, files: &Files) -> Result<(), CacheError> {
    let io = |source| CacheError::Io {
        path: dest.to_path_buf(),
        source,
    };
    fs::create_dir_all(dest).map_err(io)?;
    for (rel, content) in files {
        let path = dest.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        fs::write(&path, content).map_err(io)?;
    }
    fs::write(dest.join(ORIGIN_MARKER), url).map_err(io)
}

impl GitTransport for MockTransport {
    fn clone_checkout(
        &self,
        url: &str,
        git_ref: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), CacheError> {
        self.wait(url, timeout)?;
        let files = self.files(url, git_ref)?;
        write_files(dest, url, &files)
    }

    fn fetch_checkout(
        &self,
        path: &Path,
        url: &str,
        git_ref: &str,
        timeout: Duration,
    ) -> Result<(), CacheError> {
        self.wait(url, timeout)?;
        let files = self.files(url, git_ref)?;
        fs::remove_dir_all(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        write_files(path, url, &files)
    }

    fn verify(&self, path: &Path, expected_url: &str) -> Result<(), CacheError> {
        let origin = fs::read_to_string(path.join(ORIGIN_MARKER)).map_err(|_| {
            CacheError::DirtyCache {
                path: path.to_path_buf(),
                reason: "not a git checkout".to_owned(),
            }
        })?;
        if normalize_url(&origin) != expected_url {
            return Err(CacheError::DirtyCache {
                path: path.to_path_buf(),
                reason: format!("origin is '{origin}'"),
            });
        }
        Ok(())
    }
}

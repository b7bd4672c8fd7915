//! The network-facing half of the cache.

use std::path::Path;
use std::time::Duration;

use crate::CacheError;

/// Moves repository data between a remote and a local checkout.
///
/// [`GitCache`](crate::GitCache) decides *when* to clone or fetch; a
/// transport only knows *how*. Tests substitute an in-memory transport.
pub trait GitTransport: Send + Sync {
    /// Clone `url` into `dest` (which does not exist) and check out `git_ref`.
    ///
    /// # Errors
    ///
    /// `Unreachable` when the remote cannot be contacted within `timeout`,
    /// `RefNotFound` when `git_ref` does not resolve after cloning.
    fn clone_checkout(
        &self,
        url: &str,
        git_ref: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), CacheError>;

    /// Fetch into the checkout at `path` and move it to the latest `git_ref`.
    ///
    /// # Errors
    ///
    /// As for [`clone_checkout`](Self::clone_checkout), plus `DirtyCache`
    /// when `path` is not a usable checkout.
    fn fetch_checkout(
        &self,
        path: &Path,
        url: &str,
        git_ref: &str,
        timeout: Duration,
    ) -> Result<(), CacheError>;

    /// Confirm, without network access, that `path` is a checkout whose
    /// origin normalizes to `expected_url`.
    ///
    /// # Errors
    ///
    /// Returns `DirtyCache` describing the mismatch.
    fn verify(&self, path: &Path, expected_url: &str) -> Result<(), CacheError>;
}

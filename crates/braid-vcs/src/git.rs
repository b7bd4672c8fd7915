//! libgit2-backed transport.

use std::path::Path;
use std::time::{Duration, Instant};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks,
    Repository,
};

use crate::key::normalize_url;
use crate::transport::GitTransport;
use crate::CacheError;

/// Credential callback attempts before giving up on a remote.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Transport using libgit2 through the `git2` crate.
///
/// Checkouts are left on a detached HEAD at the resolved commit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Transport;

impl GitTransport for Git2Transport {
    fn clone_checkout(
        &self,
        url: &str,
        git_ref: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), CacheError> {
        let deadline = Instant::now() + timeout;
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options(deadline));
        let repo = builder
            .clone(url, dest)
            .map_err(|e| network_error(url, &e, deadline, timeout))?;
        checkout_ref(&repo, dest, url, git_ref)
    }

    fn fetch_checkout(
        &self,
        path: &Path,
        url: &str,
        git_ref: &str,
        timeout: Duration,
    ) -> Result<(), CacheError> {
        let repo = open(path)?;
        let deadline = Instant::now() + timeout;
        {
            let mut remote = repo
                .find_remote("origin")
                .map_err(|e| dirty(path, format!("no origin remote: {}", e.message())))?;
            let mut options = fetch_options(deadline);
            remote
                .fetch(&[] as &[&str], Some(&mut options), None)
                .map_err(|e| network_error(url, &e, deadline, timeout))?;
        }
        checkout_ref(&repo, path, url, git_ref)
    }

    fn verify(&self, path: &Path, expected_url: &str) -> Result<(), CacheError> {
        let repo = open(path)?;
        let remote = repo
            .find_remote("origin")
            .map_err(|e| dirty(path, format!("no origin remote: {}", e.message())))?;
        let actual = remote.url().map(normalize_url).unwrap_or_default();
        if actual != expected_url {
            return Err(dirty(path, format!("origin is '{actual}', expected '{expected_url}'")));
        }
        Ok(())
    }
}

fn open(path: &Path) -> Result<Repository, CacheError> {
    Repository::open(path).map_err(|e| dirty(path, format!("not a git checkout: {}", e.message())))
}

fn fetch_options(deadline: Instant) -> FetchOptions<'static> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |_| Instant::now() < deadline);
    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("credentials rejected"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username.unwrap_or("git"))
        } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            Cred::credential_helper(&config, url, username)
        } else {
            Cred::default()
        }
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options.download_tags(AutotagOption::All);
    options
}

/// Resolve `git_ref` as a remote branch, tag, local branch, then any revspec.
fn resolve_commit<'r>(repo: &'r Repository, git_ref: &str) -> Option<git2::Commit<'r>> {
    let candidates = [
        format!("refs/remotes/origin/{git_ref}"),
        format!("refs/tags/{git_ref}"),
        format!("refs/heads/{git_ref}"),
    ];
    for name in &candidates {
        if let Ok(reference) = repo.find_reference(name) {
            return reference.peel_to_commit().ok();
        }
    }
    repo.revparse_single(git_ref)
        .ok()
        .and_then(|object| object.peel_to_commit().ok())
}

fn checkout_ref(repo: &Repository, path: &Path, url: &str, git_ref: &str) -> Result<(), CacheError> {
    let commit = resolve_commit(repo, git_ref).ok_or_else(|| CacheError::RefNotFound {
        url: url.to_owned(),
        git_ref: git_ref.to_owned(),
    })?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
        .map_err(|e| dirty(path, format!("checkout failed: {}", e.message())))?;
    repo.set_head_detached(commit.id())
        .map_err(|e| dirty(path, format!("cannot move HEAD: {}", e.message())))?;
    tracing::debug!(url, git_ref, commit = %commit.id(), "Checked out");
    Ok(())
}

fn network_error(url: &str, error: &git2::Error, deadline: Instant, timeout: Duration) -> CacheError {
    let message = if error.code() == ErrorCode::User && Instant::now() >= deadline {
        format!("timed out after {}s", timeout.as_secs())
    } else if error.class() == ErrorClass::Ssh || error.code() == ErrorCode::Auth {
        format!("authentication failed: {}", error.message())
    } else {
        error.message().to_owned()
    };
    CacheError::Unreachable {
        url: url.to_owned(),
        message,
    }
}

fn dirty(path: &Path, reason: String) -> CacheError {
    CacheError::DirtyCache {
        path: path.to_path_buf(),
        reason,
    }
}

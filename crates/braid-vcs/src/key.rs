//! Cache keys and their on-disk directory names.

use std::fmt;
use std::hash::{Hash, Hasher};

use sha2::{Digest, Sha256};

/// Ref used when a source does not name one.
pub const DEFAULT_REF: &str = "main";

/// Identity of one cached checkout: normalized remote URL plus ref.
///
/// The URL as written is kept for fetching but does not take part in
/// equality, so `https://host/org/repo.git` and `https://HOST/org/repo/`
/// share one checkout.
#[derive(Debug, Clone)]
pub struct GitCacheKey {
    remote: String,
    normalized_url: String,
    git_ref: String,
}

impl GitCacheKey {
    /// Build a key; `git_ref` falls back to [`DEFAULT_REF`].
    pub fn new(url: &str, git_ref: Option<&str>) -> Self {
        let git_ref = git_ref
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REF);
        Self {
            remote: url.trim().to_owned(),
            normalized_url: normalize_url(url),
            git_ref: git_ref.to_owned(),
        }
    }

    /// URL to clone and fetch from.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Normalized URL used for identity.
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    /// Branch, tag or commit to check out.
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    /// Directory name of this key's checkout inside the cache root.
    ///
    /// `<repo>-<ref>-<digest>`: readable prefix, plus the first 16 hex
    /// characters of SHA-256 over `normalized_url \n ref`. The digest alone
    /// identifies the key; the prefix only helps humans.
    pub fn dir_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized_url.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.git_ref.as_bytes());
        let digest = hex::encode(hasher.finalize().as_slice());

        let repo = self
            .normalized_url
            .rsplit(['/', ':'])
            .find(|segment| !segment.is_empty())
            .unwrap_or("repo");
        format!("{}-{}-{}", sanitize(repo), sanitize(&self.git_ref), &digest[..16])
    }
}

impl PartialEq for GitCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_url == other.normalized_url && self.git_ref == other.git_ref
    }
}

impl Eq for GitCacheKey {}

impl Hash for GitCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized_url.hash(state);
        self.git_ref.hash(state);
    }
}

impl fmt::Display for GitCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.remote, self.git_ref)
    }
}

/// Normalize a remote URL for identity comparison.
///
/// Trims whitespace, trailing slashes and a `.git` suffix, and lowercases
/// the scheme and host. Paths keep their case.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url).trim_end_matches('/');

    if let Some((scheme, rest)) = url.split_once("://") {
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let mut normalized = format!("{}://{}", scheme.to_lowercase(), host.to_lowercase());
        if !path.is_empty() {
            normalized.push('/');
            normalized.push_str(path);
        }
        return normalized;
    }

    // scp-like `user@host:path`
    if let Some((host, path)) = url.split_once(':')
        && host.contains('@')
        && !host.contains('/')
    {
        return format!("{}:{path}", host.to_lowercase());
    }

    url.to_owned()
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

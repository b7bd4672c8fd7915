//! Source declarations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::location::{GitLocation, Location};
use crate::nav::NavSpec;
use crate::paths::{absolutize, normalize_url_prefix};

/// One declared content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SourceSpecRaw")]
pub struct SourceSpec {
    /// Unique identifier, stable across rebuilds.
    pub name: String,
    /// Display title.
    pub title: Option<String>,
    /// Normalized URL namespace (`/` by default).
    pub url_prefix: String,
    /// Where the content comes from.
    pub origin: SourceOrigin,
    /// Explicit navigation. `None` selects auto mode.
    pub nav: Option<NavSpec>,
}

/// Origin of a source's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceOrigin {
    /// Directory owned by the project.
    Local {
        /// Content directory.
        path: PathBuf,
    },
    /// External directory, treated as if it were fetched.
    RemotePath {
        /// Content directory.
        path: PathBuf,
    },
    /// Git repository, checked out through the cache.
    RemoteGit {
        /// Repository URL.
        url: String,
        /// Branch, tag or commit; `None` for the default.
        git_ref: Option<String>,
        /// Directory inside the checkout.
        subpath: Option<PathBuf>,
    },
}

impl SourceOrigin {
    /// Build an origin from a git location.
    pub fn from_git(git: GitLocation) -> Self {
        Self::RemoteGit {
            url: git.url,
            git_ref: git.git_ref,
            subpath: git.subpath,
        }
    }

    /// Whether content under this origin lives outside the git cache.
    pub fn is_filesystem(&self) -> bool {
        !matches!(self, Self::RemoteGit { .. })
    }

    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        match self {
            Self::Local { path } | Self::RemotePath { path } => *path = absolutize(path, base),
            Self::RemoteGit { .. } => {}
        }
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "local:{}", path.display()),
            Self::RemotePath { path } => write!(f, "remote:{}", path.display()),
            Self::RemoteGit { url, git_ref, .. } => match git_ref {
                Some(git_ref) => write!(f, "git:{url}#{git_ref}"),
                None => write!(f, "git:{url}"),
            },
        }
    }
}

#[derive(Deserialize)]
struct SourceSpecRaw {
    name: String,
    title: Option<String>,
    url_prefix: Option<String>,
    local: Option<Location>,
    remote: Option<Location>,
    nav: Option<NavSpec>,
}

impl TryFrom<SourceSpecRaw> for SourceSpec {
    type Error = String;

    fn try_from(raw: SourceSpecRaw) -> Result<Self, Self::Error> {
        let origin = match (raw.local, raw.remote) {
            (Some(Location::Path { path }), None) => SourceOrigin::Local { path },
            (Some(Location::Git { .. }), None) => {
                return Err(format!(
                    "source '{}': `local` takes a path, use `remote` for git",
                    raw.name
                ));
            }
            (None, Some(Location::Path { path })) => SourceOrigin::RemotePath { path },
            (None, Some(Location::Git { git })) => SourceOrigin::from_git(git),
            (Some(_), Some(_)) | (None, None) => {
                return Err(format!(
                    "source '{}' must declare exactly one of `local` or `remote`",
                    raw.name
                ));
            }
        };
        Ok(Self {
            name: raw.name,
            title: raw.title,
            url_prefix: normalize_url_prefix(raw.url_prefix.as_deref().unwrap_or("/")),
            origin,
            nav: raw.nav,
        })
    }
}

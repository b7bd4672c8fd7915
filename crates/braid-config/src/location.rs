//! Content locations: filesystem paths and git repositories.
//!
//! A location appears wherever a document points at content that lives
//! somewhere else: `remote` sources, a child's `parent`, `dev.parent` and
//! `theme.location`.
//!
//! ```toml
//! parent = { path = "../site" }
//! parent = { git = "https://github.com/org/site#v2" }
//! parent = { git = { url = "https://github.com/org/site", ref = "v2", subpath = "docs" } }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::paths::absolutize;

/// Where a piece of content lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    /// Filesystem directory (or, for parents, a config file).
    Path {
        /// Path, relative to the declaring document until resolved.
        path: PathBuf,
    },
    /// Git repository.
    Git {
        /// Repository URL, ref and optional subpath.
        git: GitLocation,
    },
}

impl Location {
    /// Resolve a relative `path` against the declaring document's directory.
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        if let Self::Path { path } = self {
            *path = absolutize(path, base);
        }
    }
}

/// Git repository reference.
///
/// Accepts either a compact `"url#ref"` string or an expanded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GitLocationRaw")]
pub struct GitLocation {
    /// Repository URL as written.
    pub url: String,
    /// Branch, tag or commit. `None` means the default ref.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Directory inside the checkout, applied after checkout.
    pub subpath: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GitLocationRaw {
    Compact(String),
    Expanded {
        url: String,
        #[serde(rename = "ref")]
        git_ref: Option<String>,
        subpath: Option<PathBuf>,
    },
}

impl TryFrom<GitLocationRaw> for GitLocation {
    type Error = InvalidGitLocation;

    fn try_from(raw: GitLocationRaw) -> Result<Self, Self::Error> {
        match raw {
            GitLocationRaw::Compact(spec) => spec.parse(),
            GitLocationRaw::Expanded {
                url,
                git_ref,
                subpath,
            } => {
                if url.trim().is_empty() {
                    return Err(InvalidGitLocation("git url cannot be empty"));
                }
                Ok(Self {
                    url,
                    git_ref: git_ref.filter(|r| !r.trim().is_empty()),
                    subpath,
                })
            }
        }
    }
}

impl FromStr for GitLocation {
    type Err = InvalidGitLocation;

    /// Parse the compact `url#ref` form. The ref is optional.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let (url, git_ref) = match spec.rsplit_once('#') {
            Some((url, git_ref)) => (url, Some(git_ref)),
            None => (spec, None),
        };
        if url.is_empty() {
            return Err(InvalidGitLocation("git url cannot be empty"));
        }
        Ok(Self {
            url: url.to_owned(),
            git_ref: git_ref.filter(|r| !r.is_empty()).map(str::to_owned),
            subpath: None,
        })
    }
}

/// Rejected git location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGitLocation(&'static str);

impl fmt::Display for InvalidGitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for InvalidGitLocation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        location: Location,
    }

    fn parse(toml: &str) -> Location {
        toml::from_str::<Holder>(toml).unwrap().location
    }

    #[test]
    fn test_parse_path_location() {
        let location = parse(r#"location = { path = "../site" }"#);
        assert_eq!(
            location,
            Location::Path {
                path: PathBuf::from("../site")
            }
        );
    }

    #[test]
    fn test_parse_compact_git_with_ref() {
        let location = parse(r#"location = { git = "https://example.com/org/site.git#v2" }"#);
        let Location::Git { git } = location else {
            panic!("expected git location");
        };
        assert_eq!(git.url, "https://example.com/org/site.git");
        assert_eq!(git.git_ref.as_deref(), Some("v2"));
        assert_eq!(git.subpath, None);
    }

    #[test]
    fn test_parse_compact_git_without_ref() {
        let git: GitLocation = "https://example.com/org/site".parse().unwrap();
        assert_eq!(git.url, "https://example.com/org/site");
        assert_eq!(git.git_ref, None);
    }

    #[test]
    fn test_parse_compact_git_trailing_hash_is_default_ref() {
        let git: GitLocation = "https://example.com/org/site#".parse().unwrap();
        assert_eq!(git.git_ref, None);
    }

    #[test]
    fn test_parse_expanded_git() {
        let location = parse(
            r#"location = { git = { url = "git@example.com:org/site.git", ref = "release", subpath = "docs" } }"#,
        );
        let Location::Git { git } = location else {
            panic!("expected git location");
        };
        assert_eq!(git.url, "git@example.com:org/site.git");
        assert_eq!(git.git_ref.as_deref(), Some("release"));
        assert_eq!(git.subpath, Some(PathBuf::from("docs")));
    }

    #[test]
    fn test_empty_git_url_rejected() {
        assert!("#main".parse::<GitLocation>().is_err());
        let result = toml::from_str::<Holder>(r#"location = { git = { url = " " } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths_only_touches_path_locations() {
        let mut location = Location::Path {
            path: PathBuf::from("site"),
        };
        location.resolve_paths(Path::new("/work"));
        assert_eq!(
            location,
            Location::Path {
                path: PathBuf::from("/work/site")
            }
        );

        let mut git = parse(r#"location = { git = "https://example.com/x" }"#);
        let before = git.clone();
        git.resolve_paths(Path::new("/work"));
        assert_eq!(git, before);
    }
}

//! Configuration documents for braid.
//!
//! Parses `braid.toml` files with serde. A document is either a *root*
//! (it has a `[site]` table and declares sources) or a *child* (it has a
//! `parent` location and stands in for one of the parent's sources).
//!
//! Relative paths are anchored at the directory of the document that
//! declares them, and unrecognized keys are ignored at every level so that
//! theme and renderer settings can share the file.

mod child;
mod location;
mod nav;
mod paths;
mod root;
mod settings;
mod source;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::IgnoredAny;

pub use child::{ChildConfig, ContentLocation, Overrides, SiteOverrides, ThemeOverrides};
pub use location::{GitLocation, InvalidGitLocation, Location};
pub use nav::{NavItem, NavSpec};
pub use paths::normalize_url_prefix;
pub use root::RootConfig;
pub use settings::{
    BuildSettings, CacheSettings, DevSettings, SiteSettings, ThemeSettings, WatchSettings,
};
pub use source::{SourceOrigin, SourceSpec};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "braid.toml";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error while reading a document.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Document path.
        path: PathBuf,
        /// Parser error, including the offending key and line.
        #[source]
        source: toml::de::Error,
    },
    /// Document is neither a root nor a child.
    #[error("{}: {message}", path.display())]
    DocumentKind {
        /// Document path.
        path: PathBuf,
        /// What is wrong.
        message: &'static str,
    },
    /// Field validation error.
    #[error("Configuration error in {field}: {message}")]
    Validation {
        /// Field path (e.g., "`sources[2].name`").
        field: String,
        /// What is wrong.
        message: String,
    },
    /// Two sources share a name.
    #[error("Duplicate source name '{name}' at {field}")]
    DuplicateSourceName {
        /// Repeated name.
        name: String,
        /// Field path of the second occurrence.
        field: String,
    },
    /// Two sources map to the same URL prefix.
    #[error("Sources '{first}' and '{second}' share url_prefix {prefix}")]
    PrefixCollision {
        /// Normalized prefix.
        prefix: String,
        /// Earlier source.
        first: String,
        /// Later source.
        second: String,
    },
    /// A child names a source its parent does not declare.
    #[error("Parent {} has no source named '{name}'", parent.display())]
    UnknownParentSource {
        /// Child's `name`.
        name: String,
        /// Parent document path.
        parent: PathBuf,
    },
    /// A child's parent is itself a child document.
    #[error("Parent {} is a child configuration; only one level of parent is supported", path.display())]
    NestedChildParent {
        /// Parent document path.
        path: PathBuf,
    },
}

impl ConfigError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Require a string field to be non-empty.
pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::validation(field, "cannot be empty"));
    }
    Ok(())
}

/// Parsed document, root or child.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigDocument {
    /// Site root.
    Root(RootConfig),
    /// Child of another site.
    Child(ChildConfig),
}

/// A document together with where it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Document path.
    pub path: PathBuf,
    /// Directory relative paths were resolved against.
    pub dir: PathBuf,
    /// Parsed and validated content.
    pub document: ConfigDocument,
}

#[derive(Deserialize)]
struct KindProbe {
    site: Option<IgnoredAny>,
    parent: Option<IgnoredAny>,
}

impl LoadedConfig {
    /// Read, parse, resolve paths and validate a document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` for a missing file, `Parse` for
    /// malformed TOML, and a validation variant for invalid content.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse document text as if it were read from `path`.
    ///
    /// # Errors
    ///
    /// Same as [`LoadedConfig::load`], minus I/O.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_error = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let probe: KindProbe = toml::from_str(content).map_err(parse_error)?;
        let document = match (probe.site.is_some(), probe.parent.is_some()) {
            (true, false) => {
                let mut root: RootConfig = toml::from_str(content).map_err(parse_error)?;
                root.resolve_paths(&dir);
                root.validate()?;
                ConfigDocument::Root(root)
            }
            (false, true) => {
                let mut child: ChildConfig = toml::from_str(content).map_err(parse_error)?;
                child.resolve_paths(&dir);
                child.validate()?;
                ConfigDocument::Child(child)
            }
            (true, true) => {
                return Err(ConfigError::DocumentKind {
                    path: path.to_path_buf(),
                    message: "document declares both [site] and `parent`",
                });
            }
            (false, false) => {
                return Err(ConfigError::DocumentKind {
                    path: path.to_path_buf(),
                    message: "document declares neither [site] nor `parent`",
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            dir,
            document,
        })
    }

    /// Cache settings declared by this document.
    pub fn cache_settings(&self) -> &CacheSettings {
        match &self.document {
            ConfigDocument::Root(root) => &root.cache,
            ConfigDocument::Child(child) => &child.cache,
        }
    }

    /// Cache root for this document.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_settings().cache_dir(&self.dir)
    }
}

/// Search for `braid.toml` in `start` and its parents.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Pick the document to load: an explicit path or the discovered one.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the explicit path is missing or no
/// document is found from `cwd` upwards.
pub fn locate_config(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => {
            let path = if path.is_relative() {
                cwd.join(path)
            } else {
                path.to_path_buf()
            };
            if path.is_file() {
                Ok(path)
            } else {
                Err(ConfigError::NotFound(path))
            }
        }
        None => discover_config(cwd).ok_or_else(|| ConfigError::NotFound(cwd.join(CONFIG_FILENAME))),
    }
}

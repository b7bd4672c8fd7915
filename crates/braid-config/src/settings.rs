//! Site-wide settings tables shared by root and child documents.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// `[site]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Site name.
    pub name: String,
    /// Public base URL.
    pub url: Option<String>,
    /// Output directory for rendered files.
    pub output: Option<String>,
    /// Favicon path.
    pub favicon: Option<String>,
    /// Repository link shown on pages.
    pub repository: Option<String>,
    /// Path segment for "edit this page" links.
    pub edit_path: Option<String>,
}

/// `[theme]` table.
///
/// `settings` is free-form and consumed by the theme; the core only merges it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeSettings {
    /// Theme files location.
    pub location: Option<Location>,
    /// Theme-specific values.
    #[serde(default)]
    pub settings: toml::Table,
}

impl ThemeSettings {
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        if let Some(location) = &mut self.location {
            location.resolve_paths(base);
        }
    }
}

/// `[build]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Skip sources that fail to materialize instead of aborting.
    pub continue_on_source_error: bool,
}

/// `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache root. Defaults to `.braid/cache` next to the document.
    pub dir: Option<PathBuf>,
    /// Network timeout for clone and fetch, in seconds.
    pub timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            timeout_secs: 120,
        }
    }
}

impl CacheSettings {
    /// Directory name used when no `dir` is configured.
    pub const DEFAULT_DIR: &'static str = ".braid/cache";

    /// Cache root for a document located in `base`.
    pub fn cache_dir(&self, base: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => crate::paths::absolutize(dir, base),
            None => base.join(Self::DEFAULT_DIR),
        }
    }
}

/// `[dev]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevSettings {
    /// Local replacement for a child's `parent` location.
    pub parent: Option<Location>,
    /// Whether connected clients reload on change.
    pub live_reload: bool,
    /// File watching.
    pub watch: WatchSettings,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            parent: None,
            live_reload: true,
            watch: WatchSettings::default(),
        }
    }
}

impl DevSettings {
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        if let Some(parent) = &mut self.parent {
            parent.resolve_paths(base);
        }
    }
}

/// `[dev.watch]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Use polling instead of native filesystem events.
    pub poll: bool,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Quiet period before a change triggers a pass, in milliseconds.
    pub debounce_ms: u64,
    /// Glob patterns for files whose changes are ignored.
    pub ignore: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: 500,
            debounce_ms: 100,
            ignore: Vec::new(),
        }
    }
}

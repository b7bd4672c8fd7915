//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod clean;
pub(crate) mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use braid_config::{LoadedConfig, locate_config};
use braid_site::{SiteModel, SourceModel};
use braid_vcs::GitCache;

pub(crate) use build::BuildArgs;
pub(crate) use clean::CleanArgs;
pub(crate) use watch::WatchArgs;

use crate::error::CliError;
use crate::output::Output;

/// Configuration document and the git cache it declares.
pub(crate) struct Workspace {
    pub config_path: PathBuf,
    pub cache: Arc<GitCache>,
}

impl Workspace {
    /// Locate the document (explicit or discovered from the working
    /// directory) and open its cache.
    pub(crate) fn open(explicit: Option<&Path>) -> Result<Self, CliError> {
        let cwd = std::env::current_dir()?;
        Self::open_from(explicit, &cwd)
    }

    fn open_from(explicit: Option<&Path>, cwd: &Path) -> Result<Self, CliError> {
        let config_path = locate_config(explicit, cwd)?;
        let loaded = LoadedConfig::load(&config_path)?;
        let timeout = Duration::from_secs(loaded.cache_settings().timeout_secs);
        let cache = GitCache::new(loaded.cache_dir()).with_timeout(timeout);
        Ok(Self {
            config_path,
            cache: Arc::new(cache),
        })
    }
}

/// One summary line per source.
fn source_line(source: &SourceModel) -> String {
    format!(
        "{:<16} {:<16} {:>4} pages",
        source.name(),
        source.spec.url_prefix,
        source.pages.len()
    )
}

/// Print the site summary shared by `build` and `watch`.
pub(crate) fn print_summary(output: &Output, model: &SiteModel) {
    output.highlight(&model.site.name);
    for source in &model.sources {
        output.info(&source_line(source));
        output.detail(&format!("  {}", source.root.content_dir().display()));
    }
    for skipped in &model.skipped {
        output.warning(&format!("Skipped source '{}': {}", skipped.name, skipped.error));
    }
}

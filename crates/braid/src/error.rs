//! CLI error types.

use braid_config::ConfigError;
use braid_site::BuildError;
use braid_vcs::CacheError;
use braid_watch::WatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("Failed to serialize site model: {0}")]
    Json(#[from] serde_json::Error),
}

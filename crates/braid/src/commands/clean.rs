//! `braid clean` command implementation.

use std::path::PathBuf;

use clap::Args;

use crate::commands::Workspace;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clean command.
#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Path to configuration file (default: auto-discover braid.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List cached checkouts without removing them.
    #[arg(long)]
    dry_run: bool,
}

impl CleanArgs {
    /// Execute the clean command.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be listed or removed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let workspace = Workspace::open(self.config.as_deref())?;
        let root = workspace.cache.root();

        let entries = workspace.cache.entries()?;
        if entries.is_empty() {
            output.info(&format!("Cache is empty: {}", root.display()));
            return Ok(());
        }

        if self.dry_run {
            for entry in &entries {
                output.info(&entry.display().to_string());
            }
            output.warning(&format!(
                "Dry run: {} cached checkouts would be removed",
                entries.len()
            ));
            return Ok(());
        }

        workspace.cache.purge_all()?;
        output.success(&format!(
            "Removed {} cached checkouts from {}",
            entries.len(),
            root.display()
        ));
        Ok(())
    }
}

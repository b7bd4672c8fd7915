//! `braid watch` command implementation.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use braid_site::Session;
use braid_watch::{FsWatcher, WatchLoop};
use clap::Args;

use crate::commands::{Workspace, print_summary};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Path to configuration file (default: auto-discover braid.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll for changes instead of using native filesystem events.
    #[arg(long)]
    poll: bool,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until interrupted. Only the initial resolution can fail the
    /// command; later failures are reported and the last good site is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial pass fails or the watcher cannot start.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let workspace = Workspace::open(self.config.as_deref())?;
        let session = Session::new(Arc::clone(&workspace.cache));
        let initial = session.run(&workspace.config_path)?;
        print_summary(&output, &initial);

        let mut settings = initial.dev.watch.clone();
        settings.poll |= self.poll;
        let (tx, rx) = mpsc::channel();
        let watcher = FsWatcher::new(&settings, tx)?;

        let config_path = workspace.config_path.clone();
        let resolve = || session.run(&config_path);
        let mut watch =
            WatchLoop::new(resolve, workspace.config_path.clone(), initial).with_watcher(watcher);

        output.info(&format!(
            "Watching {} content directories and {} config files",
            watch.classifier().roots().len(),
            watch.classifier().config_files().count()
        ));

        watch.run(&rx, |outcome| match outcome {
            Ok(signal) if signal.reload_needed => output.success(&format!(
                "Site updated: {} pages, reload needed",
                signal.model.page_count()
            )),
            Ok(signal) => output.detail(&format!(
                "Re-resolved after {} changes, no reload needed",
                signal.changed.len()
            )),
            Err(e) => output.error(&format!("Error: {e} (serving the last good site)")),
        });
        Ok(())
    }
}

//! `braid build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use braid_site::{ResolveOptions, Session, SiteModel};
use clap::Args;

use crate::commands::{Workspace, print_summary};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover braid.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch git sources even when they are already cached.
    #[arg(long)]
    refresh: bool,

    /// Skip sources that cannot be materialized instead of failing.
    #[arg(long)]
    keep_going: bool,

    /// Print the resolved site model as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns the first fatal resolution error.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let workspace = Workspace::open(self.config.as_deref())?;
        let model = self.resolve(&workspace)?;

        if self.json {
            output.result(&serde_json::to_string_pretty(&model)?);
            return Ok(());
        }

        print_summary(&output, &model);
        output.success(&format!(
            "Resolved {} pages from {} sources",
            model.page_count(),
            model.sources.len()
        ));
        Ok(())
    }

    fn resolve(&self, workspace: &Workspace) -> Result<SiteModel, CliError> {
        let options = ResolveOptions {
            continue_on_source_error: self.keep_going,
            refresh: self.refresh,
        };
        let session = Session::new(Arc::clone(&workspace.cache)).with_options(options);
        Ok(session.run(&workspace.config_path)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn args(flags: &[&str]) -> BuildArgs {
        let argv = std::iter::once("build").chain(flags.iter().copied());
        Harness::try_parse_from(argv).unwrap().args
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.md"), "# Home").unwrap();
        fs::write(
            dir.path().join("braid.toml"),
            "[site]\nname = \"x\"\n[[sources]]\nname = \"docs\"\nlocal = { path = \"docs\" }\n\
             [[sources]]\nname = \"gone\"\nurl_prefix = \"/gone\"\nlocal = { path = \"missing\" }\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_missing_source_fails_build() {
        let dir = site();
        let config = dir.path().join("braid.toml");
        let workspace = Workspace::open_from(Some(&config), dir.path()).unwrap();

        let err = args(&[]).resolve(&workspace).unwrap_err();

        assert!(matches!(err, CliError::Build(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_keep_going_skips_missing_source() {
        let dir = site();
        let config = dir.path().join("braid.toml");
        let workspace = Workspace::open_from(Some(&config), dir.path()).unwrap();

        let model = args(&["--keep-going"]).resolve(&workspace).unwrap();

        assert_eq!(model.sources.len(), 1);
        assert_eq!(model.skipped[0].name, "gone");
        assert!(model.page("/").is_some());
    }
}

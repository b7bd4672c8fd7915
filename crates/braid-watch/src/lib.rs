//! Development watch loop for braid.
//!
//! [`FsWatcher`] turns filesystem notifications into [`ChangeEvent`]s,
//! [`Classifier`] decides which of them matter for the current site, and
//! [`WatchLoop`] debounces them through a [`WatchMachine`] and re-resolves
//! the site, reporting a [`ReloadSignal`] after each pass.
//!
//! Git checkouts are never watched and never refreshed by the loop; only
//! local content roots and the configuration files the site was read from
//! trigger passes.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::PathBuf;
//! use std::sync::{Arc, mpsc};
//! use braid_site::Session;
//! use braid_vcs::GitCache;
//! use braid_watch::{FsWatcher, WatchLoop};
//!
//! let config = PathBuf::from("/site/braid.toml");
//! let session = Session::new(Arc::new(GitCache::new(PathBuf::from("/site/.braid/cache"))));
//! let initial = session.run(&config)?;
//!
//! let (tx, rx) = mpsc::channel();
//! let watcher = FsWatcher::new(&initial.dev.watch, tx)?;
//! let mut watch = WatchLoop::new(|| session.run(&config), config.clone(), initial)
//!     .with_watcher(watcher);
//! watch.run(&rx, |outcome| {
//!     if let Ok(signal) = outcome {
//!         println!("reload: {}", signal.reload_needed);
//!     }
//! });
//! # Ok(())
//! # }
//! ```

mod classify;
mod machine;
mod watch_loop;
mod watcher;

pub use classify::{ChangeClass, Classifier};
pub use machine::{WatchMachine, WatchState};
pub use watch_loop::{ReloadSignal, Resolve, WatchLoop};
pub use watcher::{ChangeEvent, ChangeKind, FsWatcher};

/// Watch setup error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The platform watcher could not be created.
    #[error("Failed to start file watcher: {0}")]
    Notify(#[from] notify::Error),
}

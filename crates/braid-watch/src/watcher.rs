//! Filesystem notifications.
//!
//! [`FsWatcher`] forwards `notify` events as [`ChangeEvent`]s over a channel
//! and keeps its watch list in line with the current site model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};

use braid_config::WatchSettings;

use crate::WatchError;
use crate::classify::Classifier;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

/// A filesystem change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Event of `kind` for `path`.
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

fn change_kind(kind: notify::EventKind) -> Option<ChangeKind> {
    match kind {
        notify::EventKind::Create(_) => Some(ChangeKind::Created),
        notify::EventKind::Modify(_) => Some(ChangeKind::Modified),
        notify::EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Native or polling watcher feeding a channel.
pub struct FsWatcher {
    inner: Box<dyn Watcher + Send>,
    watched: BTreeMap<PathBuf, RecursiveMode>,
}

impl std::fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsWatcher")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl FsWatcher {
    /// Create a watcher sending events to `tx`.
    ///
    /// Uses polling when `settings.poll` is set, native notifications
    /// otherwise. Nothing is watched until [`FsWatcher::follow`] is called.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Notify` if the watcher cannot be created.
    pub fn new(settings: &WatchSettings, tx: mpsc::Sender<ChangeEvent>) -> Result<Self, WatchError> {
        let handler = move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "Watch error");
                    return;
                }
            };
            let Some(kind) = change_kind(event.kind) else {
                return;
            };
            for path in event.paths {
                // A closed channel means the loop is gone; nothing left to notify.
                let _ = tx.send(ChangeEvent { path, kind });
            }
        };

        let inner: Box<dyn Watcher + Send> = if settings.poll {
            let config = notify::Config::default()
                .with_poll_interval(Duration::from_millis(settings.poll_interval_ms));
            Box::new(notify::PollWatcher::new(handler, config)?)
        } else {
            Box::new(notify::recommended_watcher(handler)?)
        };

        Ok(Self {
            inner,
            watched: BTreeMap::new(),
        })
    }

    /// Paths currently watched.
    pub fn watched(&self) -> impl Iterator<Item = &Path> {
        self.watched.keys().map(PathBuf::as_path)
    }

    /// Watch exactly the content roots and configuration files known to
    /// `classifier`, adding and removing watches as needed.
    ///
    /// Configuration files are watched through their parent directory so
    /// that editors replacing the file are noticed. A target that does not
    /// exist yet is stood in for by its nearest existing ancestor, so its
    /// creation triggers a pass. Targets that cannot be watched are logged
    /// and skipped.
    pub fn follow(&mut self, classifier: &Classifier) {
        let mut wanted: BTreeMap<PathBuf, RecursiveMode> = classifier
            .roots()
            .iter()
            .map(|root| (root.clone(), RecursiveMode::Recursive))
            .collect();
        for file in classifier.config_files() {
            let Some(dir) = file.parent() else { continue };
            let covered = wanted
                .iter()
                .any(|(p, mode)| *mode == RecursiveMode::Recursive && dir.starts_with(p));
            if !covered {
                wanted.insert(dir.to_path_buf(), RecursiveMode::NonRecursive);
            }
        }
        let wanted = stand_in_for_missing(wanted);

        let stale: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|(path, mode)| wanted.get(*path) != Some(*mode))
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            if let Err(e) = self.inner.unwatch(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Unwatch failed");
            }
            self.watched.remove(&path);
        }

        for (path, mode) in wanted {
            if self.watched.contains_key(&path) {
                continue;
            }
            match self.inner.watch(&path, mode) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Watching");
                    self.watched.insert(path, mode);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot watch"),
            }
        }
    }
}

/// Replace missing targets with a non-recursive watch on their nearest
/// existing ancestor, unless a recursive target already covers it.
fn stand_in_for_missing(
    wanted: BTreeMap<PathBuf, RecursiveMode>,
) -> BTreeMap<PathBuf, RecursiveMode> {
    let (present, missing): (BTreeMap<_, _>, BTreeMap<_, _>) =
        wanted.into_iter().partition(|(path, _)| path.exists());
    let mut result = present;
    for path in missing.into_keys() {
        let Some(ancestor) = path.ancestors().skip(1).find(|a| a.exists()) else {
            continue;
        };
        tracing::debug!(
            path = %path.display(),
            ancestor = %ancestor.display(),
            "Target missing, watching ancestor"
        );
        let covered = result.iter().any(|(p, mode)| {
            ancestor.starts_with(p) && (*mode == RecursiveMode::Recursive || p == ancestor)
        });
        if !covered {
            result.insert(ancestor.to_path_buf(), RecursiveMode::NonRecursive);
        }
    }
    result
}

//! The debounced re-resolution loop.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use braid_site::{BuildError, SiteModel};

use crate::classify::{ChangeClass, Classifier};
use crate::machine::{WatchMachine, WatchState};
use crate::watcher::{ChangeEvent, FsWatcher};

/// Produces a fresh [`SiteModel`] for each pass.
///
/// Implemented for closures, so a [`braid_site::Session`] plugs in as
/// `|| session.run(&config_path)`.
pub trait Resolve {
    /// Run one resolution pass.
    ///
    /// # Errors
    ///
    /// Returns the pass's `BuildError`; the loop keeps the last good model.
    fn resolve(&self) -> Result<SiteModel, BuildError>;
}

impl<F> Resolve for F
where
    F: Fn() -> Result<SiteModel, BuildError>,
{
    fn resolve(&self) -> Result<SiteModel, BuildError> {
        self()
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone)]
pub struct ReloadSignal {
    /// Whether connected clients should reload.
    pub reload_needed: bool,
    /// Whether a configuration file was among the changes.
    pub config_changed: bool,
    /// Changed paths that triggered the pass, sorted.
    pub changed: Vec<PathBuf>,
    /// The new model.
    pub model: Arc<SiteModel>,
}

#[derive(Debug, Default)]
struct Pending {
    config_changed: bool,
    files: BTreeSet<PathBuf>,
}

impl Pending {
    fn merge(&mut self, other: Pending) {
        self.config_changed |= other.config_changed;
        self.files.extend(other.files);
    }
}

/// Watches a resolved site and re-resolves it after changes settle.
///
/// Passes never overlap: changes seen during a pass queue exactly one
/// follow-up pass. A failed pass is logged and the previous model stays
/// current.
pub struct WatchLoop<R> {
    resolver: R,
    config_path: PathBuf,
    model: Arc<SiteModel>,
    classifier: Classifier,
    machine: WatchMachine,
    pending: Pending,
    watcher: Option<FsWatcher>,
}

impl<R> std::fmt::Debug for WatchLoop<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop")
            .field("config_path", &self.config_path)
            .field("machine", &self.machine)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

fn debounce(model: &SiteModel) -> Duration {
    Duration::from_millis(model.dev.watch.debounce_ms)
}

impl<R: Resolve> WatchLoop<R> {
    /// Create a loop for the site resolved from `config_path`, starting from
    /// `initial`.
    pub fn new(resolver: R, config_path: impl Into<PathBuf>, initial: SiteModel) -> Self {
        let config_path = config_path.into();
        Self {
            classifier: Classifier::new(&initial, &config_path),
            machine: WatchMachine::new(debounce(&initial)),
            model: Arc::new(initial),
            resolver,
            config_path,
            pending: Pending::default(),
            watcher: None,
        }
    }

    /// Keep `watcher`'s targets in line with each new model.
    #[must_use]
    pub fn with_watcher(mut self, mut watcher: FsWatcher) -> Self {
        watcher.follow(&self.classifier);
        self.watcher = Some(watcher);
        self
    }

    /// Last good model.
    pub fn model(&self) -> &Arc<SiteModel> {
        &self.model
    }

    /// Classifier for the last good model.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Current machine state.
    pub fn state(&self) -> WatchState {
        self.machine.state()
    }

    /// Record a change observed at `now`.
    ///
    /// Returns `false` if the path is irrelevant to the site.
    pub fn observe(&mut self, event: &ChangeEvent, now: Instant) -> bool {
        let Some(class) = self.classifier.classify(&event.path) else {
            tracing::trace!(path = %event.path.display(), "Ignoring change");
            return false;
        };
        tracing::debug!(path = %event.path.display(), kind = ?event.kind, class = ?class, "Change");
        if class == ChangeClass::Config {
            self.pending.config_changed = true;
        }
        self.pending.files.insert(event.path.clone());
        self.machine.on_change(now);
        true
    }

    /// Process events until the channel disconnects.
    ///
    /// `on_pass` is called after every pass with its outcome. A pass still
    /// pending when the channel closes runs before returning.
    pub fn run<F>(&mut self, events: &Receiver<ChangeEvent>, mut on_pass: F)
    where
        F: FnMut(Result<&ReloadSignal, &BuildError>),
    {
        loop {
            let received = match self.machine.next_deadline() {
                Some(deadline) => {
                    match events.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };
            if let Some(event) = received {
                self.observe(&event, Instant::now());
            }
            if self.machine.poll(Instant::now()) {
                self.pass(events, &mut on_pass);
            }
        }

        if self.machine.flush() {
            self.pass(events, &mut on_pass);
        }
    }

    fn pass<F>(&mut self, events: &Receiver<ChangeEvent>, on_pass: &mut F)
    where
        F: FnMut(Result<&ReloadSignal, &BuildError>),
    {
        let pending = std::mem::take(&mut self.pending);
        tracing::info!(
            changed = pending.files.len(),
            config_changed = pending.config_changed,
            "Re-resolving site"
        );
        let result = self.resolver.resolve();

        let now = Instant::now();
        while let Ok(event) = events.try_recv() {
            self.observe(&event, now);
        }

        match result {
            Ok(model) => {
                let signal = self.accept(model, pending);
                self.machine.finish(true, Instant::now());
                on_pass(Ok(&signal));
            }
            Err(e) => {
                tracing::error!(error = %e, "Resolution failed, keeping the last good site");
                self.pending.merge(pending);
                self.classifier.add_declared(&self.config_path);
                if let Some(watcher) = &mut self.watcher {
                    watcher.follow(&self.classifier);
                }
                self.machine.finish(false, Instant::now());
                on_pass(Err(&e));
            }
        }
    }

    fn accept(&mut self, model: SiteModel, pending: Pending) -> ReloadSignal {
        let model = Arc::new(model);
        let page_changed = pending
            .files
            .iter()
            .any(|path| self.model.page_for_file(path).is_some() || model.page_for_file(path).is_some());
        let reload_needed = model.dev.live_reload
            && (pending.config_changed || page_changed || self.model.differs(&model));

        self.classifier = Classifier::new(&model, &self.config_path);
        if let Some(watcher) = &mut self.watcher {
            watcher.follow(&self.classifier);
        }
        self.machine.set_debounce(debounce(&model));
        self.model = Arc::clone(&model);

        tracing::info!(pages = model.page_count(), reload_needed, "Site resolved");
        ReloadSignal {
            reload_needed,
            config_changed: pending.config_changed,
            changed: pending.files.into_iter().collect(),
            model,
        }
    }
}

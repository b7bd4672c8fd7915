//! Deciding which filesystem changes matter.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;

use braid_config::{
    CONFIG_FILENAME, ConfigDocument, LoadedConfig, Location, RootConfig, SourceOrigin,
    WatchSettings,
};
use braid_site::SiteModel;
use braid_source::is_skipped;

/// Kind of relevant change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// A configuration document the site was resolved from.
    Config,
    /// A file under a watched content directory.
    Content,
}

/// Maps changed paths to [`ChangeClass`]es for one site model.
#[derive(Debug, Default)]
pub struct Classifier {
    config_files: HashSet<PathBuf>,
    roots: Vec<PathBuf>,
    ignore: Vec<Pattern>,
}

impl Classifier {
    /// Build a classifier for `model`, always including `config_path`.
    pub fn new(model: &SiteModel, config_path: &Path) -> Self {
        let mut config_files: HashSet<PathBuf> = model.config_files.iter().cloned().collect();
        config_files.insert(config_path.to_path_buf());
        Self {
            config_files,
            roots: model.watched_dirs(),
            ignore: compile_patterns(&model.dev.watch),
        }
    }

    /// Add what `config_path` declares without resolving it.
    ///
    /// Covers the directories of local sources, whether or not they exist
    /// yet, and for a child document its content directory and local parent
    /// document. Documents that do not load contribute nothing.
    pub fn add_declared(&mut self, config_path: &Path) {
        let Ok(loaded) = LoadedConfig::load(config_path) else {
            return;
        };
        match &loaded.document {
            ConfigDocument::Root(root) => self.add_sources(root, None),
            ConfigDocument::Child(child) => {
                self.add_root(child.content.path.clone());
                let Location::Path { path } = child.effective_parent() else {
                    return;
                };
                let parent = if path.is_file() {
                    path.clone()
                } else {
                    path.join(CONFIG_FILENAME)
                };
                if let Ok(LoadedConfig {
                    document: ConfigDocument::Root(root),
                    ..
                }) = LoadedConfig::load(&parent)
                {
                    self.add_sources(&root, Some(&child.name));
                }
                self.config_files.insert(parent);
            }
        }
    }

    fn add_sources(&mut self, root: &RootConfig, except: Option<&str>) {
        for spec in root.sources.iter().filter(|s| Some(s.name.as_str()) != except) {
            if let SourceOrigin::Local { path } | SourceOrigin::RemotePath { path } = &spec.origin {
                self.add_root(path.clone());
            }
        }
    }

    fn add_root(&mut self, path: PathBuf) {
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
    }

    /// Directories to watch recursively.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Configuration files to watch.
    pub fn config_files(&self) -> impl Iterator<Item = &Path> {
        self.config_files.iter().map(PathBuf::as_path)
    }

    /// Classify a changed path, or `None` if it is irrelevant.
    pub fn classify(&self, path: &Path) -> Option<ChangeClass> {
        if self.config_files.contains(path) {
            return Some(ChangeClass::Config);
        }
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())?;
        if is_hidden(relative) || self.is_ignored(relative) {
            return None;
        }
        Some(ChangeClass::Content)
    }

    fn is_ignored(&self, relative: &Path) -> bool {
        let file_name = relative.file_name().and_then(|n| n.to_str());
        self.ignore.iter().any(|pattern| {
            pattern.matches_path(relative) || file_name.is_some_and(|n| pattern.matches(n))
        })
    }
}

/// Whether any component is dot-prefixed or a skipped build directory.
fn is_hidden(relative: &Path) -> bool {
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    let last = components.len().saturating_sub(1);
    components
        .iter()
        .enumerate()
        .any(|(i, name)| is_skipped(name, i < last))
}

fn compile_patterns(settings: &WatchSettings) -> Vec<Pattern> {
    settings
        .ignore
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "Ignoring invalid watch pattern");
                None
            }
        })
        .collect()
}

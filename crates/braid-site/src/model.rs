//! The resolved site handed to rendering.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use braid_config::{DevSettings, SiteSettings, SourceSpec, ThemeSettings};
use braid_source::{MaterializedRoot, PageRecord};

use crate::nav::NavTree;
use crate::resolve::SkippedSource;

/// One source with its pages and navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceModel {
    /// Declaration.
    pub spec: SourceSpec,
    /// Content on disk.
    pub root: MaterializedRoot,
    /// Navigation tree.
    pub nav: NavTree,
    /// Every page by URL, hidden pages included.
    pub pages: BTreeMap<String, PageRecord>,
}

impl SourceModel {
    /// Source name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Raw markdown of a page.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn read(&self, page: &PageRecord) -> io::Result<Vec<u8>> {
        self.root.read(page)
    }

    /// Page whose file is `path`, given as an absolute path.
    pub fn page_for_file(&self, path: &Path) -> Option<&PageRecord> {
        let relative = path.strip_prefix(self.root.content_dir()).ok()?;
        self.pages.values().find(|p| p.relative_path == relative)
    }
}

/// Resolved site: settings, sources, pages and navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteModel {
    /// Site settings.
    pub site: SiteSettings,
    /// Theme settings.
    pub theme: ThemeSettings,
    /// Dev settings.
    pub dev: DevSettings,
    /// Sources in declaration order.
    pub sources: Vec<SourceModel>,
    /// Sources left out under `continue_on_source_error`.
    pub skipped: Vec<SkippedSource>,
    /// Configuration files the site was resolved from.
    pub config_files: Vec<PathBuf>,
}

impl SiteModel {
    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceModel> {
        self.sources.iter().find(|s| s.spec.name == name)
    }

    /// Look up a page by URL across all sources.
    pub fn page(&self, url_path: &str) -> Option<(&SourceModel, &PageRecord)> {
        self.sources
            .iter()
            .find_map(|s| s.pages.get(url_path).map(|p| (s, p)))
    }

    /// Page whose file is `path`, in any source.
    pub fn page_for_file(&self, path: &Path) -> Option<(&SourceModel, &PageRecord)> {
        self.sources
            .iter()
            .find_map(|s| s.page_for_file(path).map(|p| (s, p)))
    }

    /// Total page count.
    pub fn page_count(&self) -> usize {
        self.sources.iter().map(|s| s.pages.len()).sum()
    }

    /// Content directories that live outside the git cache.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .filter(|s| s.root.is_watched())
            .map(|s| s.root.content_dir())
            .collect()
    }

    /// Whether rendering `other` could produce different output.
    ///
    /// Compares page sets and metadata, navigation and settings. Page
    /// content is not compared.
    pub fn differs(&self, other: &SiteModel) -> bool {
        self != other
    }
}

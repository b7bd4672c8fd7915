//! Page discovery by filesystem walking.
//!
//! The scanner walks a content directory in sorted order and produces one
//! [`PageRecord`] per markdown file. Dot-prefixed entries and common build
//! directories are skipped.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::front_matter::{FrontMatter, FrontMatterParser, YamlFrontMatter, body};
use crate::naming::{EntryName, MARKDOWN_EXTENSIONS, titlecase_from_slug};

/// Directories never scanned.
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "target", "__pycache__"];

/// Title used for a root index page without one.
const HOME_TITLE: &str = "Home";

static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("H1 pattern is valid"));

/// One content file within a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// Path relative to the content directory (e.g., `guides/01-setup.md`).
    pub relative_path: PathBuf,
    /// Clean URL: source prefix, numeric prefixes and `index` stripped.
    pub url_path: String,
    /// Containing directory relative to the content directory.
    pub directory_path: PathBuf,
    /// Display title.
    pub title: String,
    /// Front matter as declared.
    pub front_matter: FrontMatter,
    /// Whether this is a directory's `index` page.
    pub is_index: bool,
}

impl PageRecord {
    /// Whether the page is left out of auto-generated navigation.
    pub fn is_hidden(&self) -> bool {
        self.front_matter.hidden
    }

    /// File name of the page.
    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Scan failure.
#[derive(Debug, thiserror::Error)]
#[error("Failed to scan {}: {source}", path.display())]
pub struct ScanError {
    /// Path being read.
    pub path: PathBuf,
    /// Underlying error.
    #[source]
    pub source: std::io::Error,
}

/// Discovers pages under a content directory.
pub struct Scanner {
    content_dir: PathBuf,
    url_prefix: String,
    parser: Arc<dyn FrontMatterParser>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("content_dir", &self.content_dir)
            .field("url_prefix", &self.url_prefix)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Create a scanner.
    ///
    /// # Arguments
    ///
    /// * `content_dir` - Directory to walk
    /// * `url_prefix` - Normalized prefix prepended to every URL (e.g., `/cli`)
    pub fn new(content_dir: PathBuf, url_prefix: &str) -> Self {
        Self {
            content_dir,
            url_prefix: url_prefix.to_owned(),
            parser: Arc::new(YamlFrontMatter),
        }
    }

    /// Use a different front matter parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn FrontMatterParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Walk the content directory and return its pages in walk order.
    ///
    /// When two files map to the same URL, a directory `index` page wins over
    /// a sibling file, otherwise the first in walk order wins; the other is
    /// dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if a directory or page cannot be read.
    pub fn scan(&self) -> Result<Vec<PageRecord>, ScanError> {
        let mut files = Vec::new();
        collect_markdown(&self.content_dir, Path::new(""), &mut files)?;

        let mut pages: Vec<PageRecord> = Vec::with_capacity(files.len());
        let mut by_url: HashMap<String, usize> = HashMap::new();
        for relative_path in files {
            let page = self.build_page(relative_path)?;
            match by_url.get(&page.url_path) {
                Some(&existing) if page.is_index && !pages[existing].is_index => {
                    tracing::warn!(
                        url = %page.url_path,
                        kept = %page.relative_path.display(),
                        dropped = %pages[existing].relative_path.display(),
                        "Duplicate page URL"
                    );
                    pages[existing] = page;
                }
                Some(&existing) => {
                    tracing::warn!(
                        url = %page.url_path,
                        kept = %pages[existing].relative_path.display(),
                        dropped = %page.relative_path.display(),
                        "Duplicate page URL"
                    );
                }
                None => {
                    by_url.insert(page.url_path.clone(), pages.len());
                    pages.push(page);
                }
            }
        }

        tracing::debug!(dir = %self.content_dir.display(), pages = pages.len(), "Scanned");
        Ok(pages)
    }

    fn build_page(&self, relative_path: PathBuf) -> Result<PageRecord, ScanError> {
        let path = self.content_dir.join(&relative_path);
        let bytes = fs::read(&path).map_err(|source| ScanError {
            path: path.clone(),
            source,
        })?;
        let content = String::from_utf8(bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Page is not valid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        });

        let front_matter = self.parser.parse(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring front matter");
            FrontMatter::default()
        });

        let directory_path = relative_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = EntryName::parse(&file_name).stem.to_owned();
        let is_index = stem.eq_ignore_ascii_case("index");

        let title = front_matter
            .title
            .clone()
            .or_else(|| extract_h1(body(&content)))
            .unwrap_or_else(|| fallback_title(&directory_path, &stem, is_index));

        let url_path = self.url_for(&directory_path, &stem, is_index, front_matter.slug.as_deref());

        Ok(PageRecord {
            relative_path,
            url_path,
            directory_path,
            title,
            front_matter,
            is_index,
        })
    }

    fn url_for(&self, directory: &Path, stem: &str, is_index: bool, slug: Option<&str>) -> String {
        let mut segments: Vec<String> = directory
            .components()
            .map(|c| {
                let name = c.as_os_str().to_string_lossy();
                EntryName::parse(&name).stem.to_owned()
            })
            .collect();
        if !is_index {
            segments.push(stem.to_owned());
        }
        if let Some(slug) = slug.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
            match segments.last_mut() {
                Some(last) => slug.clone_into(last),
                None => segments.push(slug.to_owned()),
            }
        }
        join_url(&self.url_prefix, &segments)
    }
}

/// Join a normalized prefix and path segments into a URL path.
fn join_url(prefix: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        return prefix.to_owned();
    }
    let base = prefix.trim_end_matches('/');
    format!("{base}/{}", segments.join("/"))
}

fn extract_h1(content: &str) -> Option<String> {
    H1.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('#').trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn fallback_title(directory: &Path, stem: &str, is_index: bool) -> String {
    if !is_index {
        return titlecase_from_slug(stem);
    }
    match directory.file_name() {
        Some(dir) => titlecase_from_slug(EntryName::parse(&dir.to_string_lossy()).stem),
        None => HOME_TITLE.to_owned(),
    }
}

/// Recursively collect markdown files under `dir`, sorted by name.
fn collect_markdown(root: &Path, relative: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScanError> {
    let dir = root.join(relative);
    let entries = fs::read_dir(&dir).map_err(|source| ScanError {
        path: dir.clone(),
        source,
    })?;

    // Lossy names for filtering and ordering, raw names for paths.
    let mut entries: Vec<(String, bool, OsString)> = entries
        .filter_map(Result::ok)
        .map(|e| {
            let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
            let raw = e.file_name();
            (raw.to_string_lossy().into_owned(), is_dir, raw)
        })
        .filter(|(name, is_dir, _)| !is_skipped(name, *is_dir))
        .collect();
    entries.sort();

    for (name, is_dir, raw) in entries {
        let child = relative.join(&raw);
        if is_dir {
            collect_markdown(root, &child, out)?;
        } else if is_markdown(&name) {
            out.push(child);
        }
    }
    Ok(())
}

/// Whether a directory entry is excluded from scanning and watching.
pub fn is_skipped(name: &str, is_dir: bool) -> bool {
    name.starts_with('.') || (is_dir && SKIPPED_DIRS.contains(&name))
}

/// Whether a file name has a markdown extension.
pub fn is_markdown(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MARKDOWN_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
}

//! Source materialization and page discovery for braid.
//!
//! A [`SourceMaterializer`] turns a declared source into a
//! [`MaterializedRoot`] on disk, going through the git cache for remote
//! repositories. A [`Scanner`] then walks the root's content directory and
//! produces [`PageRecord`]s.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use braid_source::{Scanner, SourceMaterializer};
//!
//! let materializer = SourceMaterializer::new(Arc::new(cache));
//! let root = materializer.materialize(&spec)?;
//! let pages = Scanner::new(root.content_dir(), &spec.url_prefix).scan()?;
//! ```

mod front_matter;
mod materialize;
mod naming;
mod scan;

use std::path::PathBuf;

use braid_vcs::CacheError;

pub use front_matter::{FrontMatter, FrontMatterError, FrontMatterParser, YamlFrontMatter, body};
pub use materialize::{MaterializedRoot, SourceMaterializer};
pub use naming::{
    EntryName, MARKDOWN_EXTENSIONS, split_numeric_prefix, strip_markdown_extension,
    titlecase_from_slug,
};
pub use scan::{PageRecord, ScanError, Scanner, is_markdown, is_skipped};

/// Failure to make a source's content available on disk.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Local or remote path does not exist or is not a directory.
    #[error("Source directory not found: {}", path.display())]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Git checkout lacks the requested subpath.
    #[error("Subpath {} not found in {url}", subpath.display())]
    SubpathNotFound {
        /// Repository URL.
        url: String,
        /// Requested subpath.
        subpath: PathBuf,
    },

    /// Git cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

//! One resolution pass: configuration, materialization, scan, navigation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use braid_source::{FrontMatterParser, ScanError, Scanner, SourceMaterializer, YamlFrontMatter};
use braid_vcs::GitCache;

use crate::model::{SiteModel, SourceModel};
use crate::nav::{NavError, build_nav};
use crate::resolve::{ConfigResolver, ResolveError, ResolvedSource};

/// Build error.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration or materialization failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A source's content could not be scanned.
    #[error("Source '{name}': {source}")]
    Scan {
        /// Source name.
        name: String,
        /// Underlying error.
        #[source]
        source: ScanError,
    },

    /// Invalid explicit navigation.
    #[error(transparent)]
    Nav(#[from] NavError),
}

/// Per-pass options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip failed sources with a warning instead of aborting.
    pub continue_on_source_error: bool,
    /// Fetch git sources even when already cached.
    pub refresh: bool,
}

/// Runs resolution passes against a shared git cache.
///
/// Each [`Session::run`] rebuilds the whole [`SiteModel`]; only git
/// checkouts carry over between passes.
pub struct Session {
    cache: Arc<GitCache>,
    options: ResolveOptions,
    parser: Arc<dyn FrontMatterParser>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over `cache`.
    pub fn new(cache: Arc<GitCache>) -> Self {
        Self {
            cache,
            options: ResolveOptions::default(),
            parser: Arc::new(YamlFrontMatter),
        }
    }

    /// Set pass options.
    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a different front matter parser.
    #[must_use]
    pub fn with_front_matter_parser(mut self, parser: Arc<dyn FrontMatterParser>) -> Self {
        self.parser = parser;
        self
    }

    /// The git cache used by every pass.
    pub fn cache(&self) -> &Arc<GitCache> {
        &self.cache
    }

    /// Pass options.
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Resolve the document at `config_path` into a [`SiteModel`].
    ///
    /// Scanning and navigation run concurrently across sources; the result
    /// does not depend on scheduling.
    ///
    /// # Errors
    ///
    /// Returns the first error in source declaration order.
    pub fn run(&self, config_path: &Path) -> Result<SiteModel, BuildError> {
        let materializer =
            SourceMaterializer::new(Arc::clone(&self.cache)).with_refresh(self.options.refresh);
        let resolved = ConfigResolver::new(&materializer)
            .with_continue_on_source_error(self.options.continue_on_source_error)
            .resolve(config_path)?;

        let results: Vec<Result<SourceModel, BuildError>> = resolved
            .sources
            .into_par_iter()
            .map(|source| self.build_source(source))
            .collect();
        let sources = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let model = SiteModel {
            site: resolved.site,
            theme: resolved.theme,
            dev: resolved.dev,
            sources,
            skipped: resolved.skipped,
            config_files: resolved.config_files,
        };
        tracing::info!(
            config = %config_path.display(),
            sources = model.sources.len(),
            pages = model.page_count(),
            "Resolution pass complete"
        );
        Ok(model)
    }

    fn build_source(&self, source: ResolvedSource) -> Result<SourceModel, BuildError> {
        let ResolvedSource { spec, root } = source;
        let pages = Scanner::new(root.content_dir(), &spec.url_prefix)
            .with_parser(Arc::clone(&self.parser))
            .scan()
            .map_err(|source| BuildError::Scan {
                name: spec.name.clone(),
                source,
            })?;
        let nav = build_nav(&spec.name, &pages, spec.nav.as_ref())?;
        let pages: BTreeMap<String, _> = pages.into_iter().map(|p| (p.url_path.clone(), p)).collect();

        tracing::debug!(source = %spec.name, pages = pages.len(), "Built source");
        Ok(SourceModel {
            spec,
            root,
            nav,
            pages,
        })
    }
}

//! Root and child configuration resolution.
//!
//! A root document resolves to its own sources. A child document resolves
//! through its parent: the parent's site is loaded, the entry named by the
//! child is swapped for the child's local content, and the child's overrides
//! are layered on top. Only one level of parent is followed.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use braid_config::{
    BuildSettings, CONFIG_FILENAME, ChildConfig, ConfigDocument, ConfigError, DevSettings,
    LoadedConfig, Location, RootConfig, SiteSettings, SourceOrigin, SourceSpec, ThemeSettings,
};
use braid_source::{MaterializedRoot, SourceError, SourceMaterializer};

/// A declared source with its content on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSource {
    /// Declaration, after child substitution.
    pub spec: SourceSpec,
    /// Materialized content.
    pub root: MaterializedRoot,
}

/// A source left out because it could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    /// Source name.
    pub name: String,
    /// Rendered error.
    pub error: String,
}

/// Fully merged configuration with every source materialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSite {
    /// Site settings, child overrides applied.
    pub site: SiteSettings,
    /// Theme settings, child overrides applied.
    pub theme: ThemeSettings,
    /// Build settings of the root document.
    pub build: BuildSettings,
    /// Dev settings: the child's when it declares them, else the root's.
    pub dev: DevSettings,
    /// Sources in declaration order.
    pub sources: Vec<ResolvedSource>,
    /// Sources skipped under `continue_on_source_error`.
    pub skipped: Vec<SkippedSource>,
    /// Configuration files read from the local filesystem.
    pub config_files: Vec<PathBuf>,
}

impl ResolvedSite {
    /// Look up a resolved source by name.
    pub fn source(&self, name: &str) -> Option<&ResolvedSource> {
        self.sources.iter().find(|s| s.spec.name == name)
    }
}

/// Resolution error.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A source could not be materialized.
    #[error("Source '{name}': {source}")]
    Source {
        /// Source name.
        name: String,
        /// Underlying error.
        #[source]
        source: SourceError,
    },

    /// The parent of a child document could not be materialized.
    #[error("Parent {location}: {source}")]
    Parent {
        /// Parent location as declared.
        location: String,
        /// Underlying error.
        #[source]
        source: SourceError,
    },
}

/// Resolves configuration documents into [`ResolvedSite`]s.
#[derive(Debug)]
pub struct ConfigResolver<'m> {
    materializer: &'m SourceMaterializer,
    continue_on_source_error: bool,
}

impl<'m> ConfigResolver<'m> {
    /// Create a resolver materializing through `materializer`.
    pub fn new(materializer: &'m SourceMaterializer) -> Self {
        Self {
            materializer,
            continue_on_source_error: false,
        }
    }

    /// Skip failed sources with a warning instead of aborting.
    ///
    /// The root document's `build.continue_on_source_error` enables the same
    /// behavior.
    #[must_use]
    pub fn with_continue_on_source_error(mut self, enabled: bool) -> Self {
        self.continue_on_source_error = enabled;
        self
    }

    /// Resolve a document of either kind.
    ///
    /// # Errors
    ///
    /// See [`ConfigResolver::resolve_root`] and [`ConfigResolver::resolve_child`].
    pub fn resolve(&self, path: &Path) -> Result<ResolvedSite, ResolveError> {
        let loaded = LoadedConfig::load(path)?;
        match &loaded.document {
            ConfigDocument::Root(root) => self.root_site(&loaded.path, root),
            ConfigDocument::Child(child) => self.child_site(&loaded.path, child),
        }
    }

    /// Resolve a root document.
    ///
    /// Sources are materialized concurrently. The first failure in
    /// declaration order aborts resolution unless source errors are
    /// demoted to warnings.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Config` for an invalid document or a child
    /// document, and `ResolveError::Source` for a source that cannot be
    /// materialized.
    pub fn resolve_root(&self, path: &Path) -> Result<ResolvedSite, ResolveError> {
        let loaded = LoadedConfig::load(path)?;
        match &loaded.document {
            ConfigDocument::Root(root) => self.root_site(&loaded.path, root),
            ConfigDocument::Child(_) => Err(ConfigError::DocumentKind {
                path: loaded.path.clone(),
                message: "expected a root configuration with [site]",
            }
            .into()),
        }
    }

    /// Resolve a child document against its parent.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Parent` when the parent cannot be
    /// materialized, `ConfigError::NestedChildParent` when the parent is
    /// itself a child, `ConfigError::UnknownParentSource` when the parent
    /// declares no source named after the child, and the errors of
    /// [`ConfigResolver::resolve_root`] for the remaining sources.
    pub fn resolve_child(&self, path: &Path) -> Result<ResolvedSite, ResolveError> {
        let loaded = LoadedConfig::load(path)?;
        match &loaded.document {
            ConfigDocument::Child(child) => self.child_site(&loaded.path, child),
            ConfigDocument::Root(_) => Err(ConfigError::DocumentKind {
                path: loaded.path.clone(),
                message: "expected a child configuration with `parent`",
            }
            .into()),
        }
    }

    fn root_site(&self, path: &Path, root: &RootConfig) -> Result<ResolvedSite, ResolveError> {
        let keep_going = self.continue_on_source_error || root.build.continue_on_source_error;
        let (sources, skipped) = self.materialize_all(&root.sources, keep_going)?;

        tracing::info!(
            config = %path.display(),
            sources = sources.len(),
            skipped = skipped.len(),
            "Resolved site"
        );

        Ok(ResolvedSite {
            site: root.site.clone(),
            theme: root.theme.clone(),
            build: root.build,
            dev: root.dev.clone(),
            sources,
            skipped,
            config_files: vec![path.to_path_buf()],
        })
    }

    fn child_site(&self, path: &Path, child: &ChildConfig) -> Result<ResolvedSite, ResolveError> {
        let parent_location = child.effective_parent();
        let (parent_path, parent_is_local) = self.parent_config_path(parent_location)?;

        let parent = LoadedConfig::load(&parent_path)?;
        let root = match parent.document {
            ConfigDocument::Root(root) => root,
            ConfigDocument::Child(_) => {
                return Err(ConfigError::NestedChildParent { path: parent.path }.into());
            }
        };

        let Some(index) = root.sources.iter().position(|s| s.name == child.name) else {
            return Err(ConfigError::UnknownParentSource {
                name: child.name.clone(),
                parent: parent.path,
            }
            .into());
        };

        let own = SourceOrigin::Local {
            path: child.content.path.clone(),
        };
        self.materializer
            .materialize_origin(&own)
            .map_err(|source| ResolveError::Source {
                name: child.name.clone(),
                source,
            })?;

        let mut specs = root.sources.clone();
        let entry = &mut specs[index];
        entry.origin = own;
        if let Some(nav) = &child.nav {
            entry.nav = Some(nav.clone());
        }

        let keep_going = self.continue_on_source_error || root.build.continue_on_source_error;
        let (sources, skipped) = self.materialize_all(&specs, keep_going)?;

        let mut site = root.site;
        child.overrides.site.apply(&mut site);
        let mut theme = root.theme;
        child.overrides.theme.apply(&mut theme);
        let dev = child.dev.clone().unwrap_or(root.dev);

        let mut config_files = vec![path.to_path_buf()];
        if parent_is_local {
            config_files.push(parent.path);
        }

        tracing::info!(
            config = %path.display(),
            source = %child.name,
            sources = sources.len(),
            skipped = skipped.len(),
            "Resolved child site"
        );

        Ok(ResolvedSite {
            site,
            theme,
            build: root.build,
            dev,
            sources,
            skipped,
            config_files,
        })
    }

    /// Locate the parent's configuration file.
    ///
    /// Returns the path and whether it lives outside the git cache.
    fn parent_config_path(&self, location: &Location) -> Result<(PathBuf, bool), ResolveError> {
        let parent_error = |source| ResolveError::Parent {
            location: describe(location),
            source,
        };
        match location {
            Location::Path { path } if path.is_file() => Ok((path.clone(), true)),
            Location::Path { path } => {
                let root = self
                    .materializer
                    .materialize_origin(&SourceOrigin::Local { path: path.clone() })
                    .map_err(parent_error)?;
                Ok((root.content_dir().join(CONFIG_FILENAME), true))
            }
            Location::Git { git } => {
                let root = self
                    .materializer
                    .materialize_origin(&SourceOrigin::from_git(git.clone()))
                    .map_err(parent_error)?;
                Ok((root.content_dir().join(CONFIG_FILENAME), false))
            }
        }
    }

    /// Materialize every spec, in parallel, keeping declaration order.
    fn materialize_all(
        &self,
        specs: &[SourceSpec],
        keep_going: bool,
    ) -> Result<(Vec<ResolvedSource>, Vec<SkippedSource>), ResolveError> {
        let results: Vec<Result<MaterializedRoot, SourceError>> = specs
            .par_iter()
            .map(|spec| self.materializer.materialize(spec))
            .collect();

        let mut sources = Vec::with_capacity(specs.len());
        let mut skipped = Vec::new();
        for (spec, result) in specs.iter().zip(results) {
            match result {
                Ok(root) => sources.push(ResolvedSource {
                    spec: spec.clone(),
                    root,
                }),
                Err(e) if keep_going => {
                    tracing::warn!(source = %spec.name, origin = %spec.origin, error = %e, "Skipping source");
                    skipped.push(SkippedSource {
                        name: spec.name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(source) => {
                    return Err(ResolveError::Source {
                        name: spec.name.clone(),
                        source,
                    });
                }
            }
        }
        Ok((sources, skipped))
    }
}

fn describe(location: &Location) -> String {
    match location {
        Location::Path { path } => path.display().to_string(),
        Location::Git { git } => match &git.git_ref {
            Some(git_ref) => format!("{}#{git_ref}", git.url),
            None => git.url.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use braid_vcs::{GitCache, GitTransport, MockTransport};
    use pretty_assertions::assert_eq;

    const PARENT_URL: &str = "https://example.com/org/site";
    const API_URL: &str = "https://example.com/org/api";

    struct Fixture {
        dir: tempfile::TempDir,
        transport: Arc<MockTransport>,
        materializer: SourceMaterializer,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let transport = Arc::new(MockTransport::new().with_repo(
                API_URL,
                "main",
                &[("docs/index.md", "# API")],
            ));
            let cache = GitCache::with_transport(
                dir.path().join(".cache"),
                Arc::clone(&transport) as Arc<dyn GitTransport>,
            );
            Self {
                dir,
                transport,
                materializer: SourceMaterializer::new(Arc::new(cache)),
            }
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn resolver(&self) -> ConfigResolver<'_> {
            ConfigResolver::new(&self.materializer)
        }
    }

    const ROOT: &str = r#"
[site]
name = "Example"
repository = "https://github.com/org/site"

[theme.settings]
accent = "blue"
layout = "wide"

[[sources]]
name = "guide"
local = { path = "guide" }

[[sources]]
name = "cli"
url_prefix = "/cli"
remote = { path = "cli-upstream" }

[[sources]]
name = "api"
url_prefix = "/api"
remote = { git = { url = "https://example.com/org/api", subpath = "docs" } }
"#;

    fn root_fixture() -> (Fixture, PathBuf) {
        let f = Fixture::new();
        f.write("site/guide/index.md", "# Guide");
        f.write("site/cli-upstream/index.md", "# Upstream CLI");
        let path = f.write("site/braid.toml", ROOT);
        (f, path)
    }

    #[test]
    fn test_resolve_root() {
        let (f, path) = root_fixture();

        let site = f.resolver().resolve_root(&path).unwrap();

        assert_eq!(site.site.name, "Example");
        let names: Vec<&str> = site.sources.iter().map(|s| s.spec.name.as_str()).collect();
        assert_eq!(names, vec!["guide", "cli", "api"]);
        assert_eq!(
            site.source("guide").unwrap().root,
            MaterializedRoot::local(f.dir.path().join("site/guide"))
        );
        let api = site.source("api").unwrap();
        assert!(api.root.is_cache_owned);
        assert!(api.root.content_dir().join("index.md").is_file());
        assert_eq!(site.config_files, vec![path]);
        assert_eq!(f.transport.fetch_count(), 1);
    }

    #[test]
    fn test_resolve_root_is_deterministic() {
        let (f, path) = root_fixture();
        let resolver = f.resolver();

        let first = resolver.resolve_root(&path).unwrap();
        let second = resolver.resolve_root(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(f.transport.fetch_count(), 1);
    }

    #[test]
    fn test_missing_source_fails_fast() {
        let f = Fixture::new();
        let path = f.write(
            "braid.toml",
            r#"
[site]
name = "x"

[[sources]]
name = "gone"
local = { path = "nope" }
"#,
        );

        let err = f.resolver().resolve_root(&path).unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Source { ref name, source: SourceError::NotFound { .. } } if name == "gone"
        ));
    }

    #[test]
    fn test_first_failure_in_declaration_order_is_reported() {
        let f = Fixture::new();
        let path = f.write(
            "braid.toml",
            r#"
[site]
name = "x"

[[sources]]
name = "unreachable"
url_prefix = "/a"
remote = { git = "https://example.com/org/missing" }

[[sources]]
name = "gone"
url_prefix = "/b"
local = { path = "nope" }
"#,
        );

        let err = f.resolver().resolve_root(&path).unwrap_err();

        assert!(matches!(err, ResolveError::Source { ref name, .. } if name == "unreachable"));
    }

    #[test]
    fn test_continue_on_source_error_skips() {
        let f = Fixture::new();
        f.write("docs/index.md", "");
        let path = f.write(
            "braid.toml",
            r#"
[site]
name = "x"

[build]
continue_on_source_error = true

[[sources]]
name = "docs"
local = { path = "docs" }

[[sources]]
name = "broken"
url_prefix = "/broken"
remote = { git = "https://example.com/org/missing" }
"#,
        );

        let site = f.resolver().resolve_root(&path).unwrap();

        assert_eq!(site.sources.len(), 1);
        assert_eq!(site.skipped.len(), 1);
        assert_eq!(site.skipped[0].name, "broken");
    }

    #[test]
    fn test_continue_on_source_error_option() {
        let f = Fixture::new();
        let path = f.write(
            "braid.toml",
            "[site]\nname = \"x\"\n[[sources]]\nname = \"gone\"\nlocal = { path = \"nope\" }\n",
        );

        let site = f
            .resolver()
            .with_continue_on_source_error(true)
            .resolve_root(&path)
            .unwrap();

        assert!(site.sources.is_empty());
        assert_eq!(site.skipped[0].name, "gone");
    }

    #[test]
    fn test_resolve_root_rejects_child() {
        let f = Fixture::new();
        let path = f.write("braid.toml", "name = \"cli\"\nparent = { path = \"../site\" }\n");

        let err = f.resolver().resolve_root(&path).unwrap_err();

        assert!(matches!(err, ResolveError::Config(ConfigError::DocumentKind { .. })));
    }

    #[test]
    fn test_resolve_child_with_local_parent() {
        let (f, _) = root_fixture();
        f.write("cli/docs/index.md", "# CLI");
        let path = f.write(
            "cli/braid.toml",
            r#"
name = "cli"
parent = { path = "../site" }
content = { path = "docs" }
nav = ["index.md"]

[overrides.site]
repository = "https://github.com/org/cli"

[overrides.theme.settings]
accent = "green"
"#,
        );

        let site = f.resolver().resolve(&path).unwrap();

        let cli = site.source("cli").unwrap();
        assert_eq!(cli.root, MaterializedRoot::local(f.dir.path().join("cli/docs")));
        assert_eq!(cli.spec.url_prefix, "/cli");
        assert_eq!(cli.spec.nav.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            site.source("guide").unwrap().root,
            MaterializedRoot::local(f.dir.path().join("site/guide"))
        );
        assert_eq!(site.site.name, "Example");
        assert_eq!(site.site.repository.as_deref(), Some("https://github.com/org/cli"));
        assert_eq!(site.theme.settings["accent"].as_str(), Some("green"));
        assert_eq!(site.theme.settings["layout"].as_str(), Some("wide"));
        assert_eq!(
            site.config_files,
            vec![path, f.dir.path().join("site/braid.toml")]
        );
    }

    #[test]
    fn test_child_leaves_other_sources_unchanged() {
        let (f, root_path) = root_fixture();
        f.write("cli/index.md", "# CLI");
        let path = f.write("cli/braid.toml", "name = \"cli\"\nparent = { path = \"../site\" }\n");

        let parent = f.resolver().resolve_root(&root_path).unwrap();
        let child = f.resolver().resolve_child(&path).unwrap();

        for name in ["guide", "api"] {
            assert_eq!(child.source(name), parent.source(name));
        }
        assert_ne!(child.source("cli"), parent.source("cli"));
    }

    #[test]
    fn test_child_with_git_parent() {
        let f = Fixture::new();
        f.transport.set_repo(
            PARENT_URL,
            "v2",
            &[
                ("docs/braid.toml", "[site]\nname = \"Remote\"\n[[sources]]\nname = \"cli\"\nlocal = { path = \"pages\" }\n[[sources]]\nname = \"home\"\nurl_prefix = \"/home\"\nlocal = { path = \"home\" }\n"),
                ("docs/home/index.md", "# Home"),
            ],
        );
        f.write("cli/index.md", "# CLI");
        let path = f.write(
            "cli/braid.toml",
            "name = \"cli\"\nparent = { git = { url = \"https://example.com/org/site\", ref = \"v2\", subpath = \"docs\" } }\n",
        );

        let site = f.resolver().resolve_child(&path).unwrap();

        assert_eq!(site.site.name, "Remote");
        assert_eq!(site.source("cli").unwrap().root, MaterializedRoot::local(f.dir.path().join("cli")));
        assert!(site.source("home").unwrap().root.content_dir().join("index.md").is_file());
        assert_eq!(site.config_files, vec![path]);
    }

    #[test]
    fn test_dev_parent_overrides_git_parent() {
        let (f, _) = root_fixture();
        f.write("cli/index.md", "");
        let path = f.write(
            "cli/braid.toml",
            r#"
name = "cli"
parent = { git = "https://example.com/org/unreachable" }

[dev]
parent = { path = "../site/braid.toml" }
live_reload = false
"#,
        );

        let site = f.resolver().resolve_child(&path).unwrap();

        assert_eq!(site.site.name, "Example");
        assert!(!site.dev.live_reload);
    }

    #[test]
    fn test_child_entry_is_not_fetched_from_parent() {
        let f = Fixture::new();
        f.write(
            "site/braid.toml",
            "[site]\nname = \"x\"\n[[sources]]\nname = \"cli\"\nremote = { git = \"https://example.com/org/cli-not-served\" }\n",
        );
        f.write("cli/index.md", "");
        let path = f.write("cli/braid.toml", "name = \"cli\"\nparent = { path = \"../site\" }\n");

        let site = f.resolver().resolve_child(&path).unwrap();

        assert_eq!(site.sources.len(), 1);
        assert_eq!(f.transport.fetch_count(), 0);
    }

    #[test]
    fn test_unknown_parent_source() {
        let (f, _) = root_fixture();
        let path = f.write("other/braid.toml", "name = \"other\"\nparent = { path = \"../site\" }\n");

        let err = f.resolver().resolve_child(&path).unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::UnknownParentSource { ref name, .. }) if name == "other"
        ));
    }

    #[test]
    fn test_nested_child_parent() {
        let (f, _) = root_fixture();
        f.write("mid/braid.toml", "name = \"cli\"\nparent = { path = \"../site\" }\n");
        let path = f.write("leaf/braid.toml", "name = \"cli\"\nparent = { path = \"../mid\" }\n");

        let err = f.resolver().resolve_child(&path).unwrap_err();

        assert!(matches!(err, ResolveError::Config(ConfigError::NestedChildParent { .. })));
        assert_eq!(f.transport.fetch_count(), 0);
    }

    #[test]
    fn test_missing_parent() {
        let f = Fixture::new();
        let path = f.write("cli/braid.toml", "name = \"cli\"\nparent = { path = \"../nowhere\" }\n");

        let err = f.resolver().resolve_child(&path).unwrap_err();

        assert!(matches!(err, ResolveError::Parent { source: SourceError::NotFound { .. }, .. }));
    }

    #[test]
    fn test_missing_child_content() {
        let (f, _) = root_fixture();
        let path = f.write(
            "cli/braid.toml",
            "name = \"cli\"\nparent = { path = \"../site\" }\ncontent = { path = \"missing\" }\n",
        );

        let err = f.resolver().resolve_child(&path).unwrap_err();

        assert!(matches!(err, ResolveError::Source { ref name, .. } if name == "cli"));
    }
}

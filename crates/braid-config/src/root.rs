//! Root site documents.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::nav::validate_items;
use crate::settings::{BuildSettings, CacheSettings, DevSettings, SiteSettings, ThemeSettings};
use crate::source::SourceSpec;
use crate::{ConfigError, require_non_empty};

/// Root document: owns the site settings and the ordered source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Site settings.
    pub site: SiteSettings,
    /// Theme settings.
    #[serde(default)]
    pub theme: ThemeSettings,
    /// Sources in declaration order.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Build behavior.
    #[serde(default)]
    pub build: BuildSettings,
    /// Git cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Development settings.
    #[serde(default)]
    pub dev: DevSettings,
}

impl RootConfig {
    /// Anchor every relative path at `base`.
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            source.origin.resolve_paths(base);
        }
        self.theme.resolve_paths(base);
        self.dev.resolve_paths(base);
    }

    /// Validate names, prefixes and navigation declarations.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.name, "site.name")?;

        if self.sources.is_empty() {
            return Err(ConfigError::validation(
                "sources",
                "at least one source is required",
            ));
        }

        let mut names: HashMap<&str, usize> = HashMap::new();
        let mut prefixes: HashMap<&str, &str> = HashMap::new();
        for (i, source) in self.sources.iter().enumerate() {
            let field = format!("sources[{i}]");
            require_non_empty(&source.name, &format!("{field}.name"))?;

            if names.insert(source.name.as_str(), i).is_some() {
                return Err(ConfigError::DuplicateSourceName {
                    name: source.name.clone(),
                    field: format!("{field}.name"),
                });
            }

            // url_prefix is normalized on parse, so equal strings collide.
            if let Some(first) = prefixes.insert(source.url_prefix.as_str(), source.name.as_str()) {
                return Err(ConfigError::PrefixCollision {
                    prefix: source.url_prefix.clone(),
                    first: first.to_owned(),
                    second: source.name.clone(),
                });
            }

            if let Some(nav) = &source.nav {
                validate_items(nav, &format!("{field}.nav"))?;
            }
        }

        Ok(())
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.name == name)
    }
}

//! Child documents: content that plugs into a parent site.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::nav::{NavSpec, validate_items};
use crate::paths::absolutize;
use crate::settings::{CacheSettings, DevSettings, SiteSettings, ThemeSettings};
use crate::{ConfigError, require_non_empty};

/// Child document.
///
/// Names the parent source it stands in for, where the parent lives, and
/// where the local content is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildConfig {
    /// Name of the parent's source entry this child replaces.
    pub name: String,
    /// Parent site location.
    pub parent: Location,
    /// Local content directory.
    #[serde(default)]
    pub content: ContentLocation,
    /// Settings layered over the parent's.
    #[serde(default)]
    pub overrides: Overrides,
    /// Navigation replacing the parent entry's.
    #[serde(default)]
    pub nav: Option<NavSpec>,
    /// Development settings; `dev.parent` replaces `parent` when set.
    #[serde(default)]
    pub dev: Option<DevSettings>,
    /// Git cache settings used when fetching the parent.
    #[serde(default)]
    pub cache: CacheSettings,
}

impl ChildConfig {
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        self.parent.resolve_paths(base);
        self.content.path = absolutize(&self.content.path, base);
        self.overrides.theme.resolve_paths(base);
        if let Some(dev) = &mut self.dev {
            dev.resolve_paths(base);
        }
    }

    /// Parent location after applying the `dev.parent` override.
    pub fn effective_parent(&self) -> &Location {
        self.dev
            .as_ref()
            .and_then(|dev| dev.parent.as_ref())
            .unwrap_or(&self.parent)
    }

    /// Validate the child's own fields.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.name, "name")?;
        if let Some(nav) = &self.nav {
            validate_items(nav, "nav")?;
        }
        Ok(())
    }
}

/// `content` table of a child document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLocation {
    /// Content directory, relative to the child document.
    pub path: PathBuf,
}

impl Default for ContentLocation {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
        }
    }
}

/// `overrides` table of a child document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    /// Site fields replacing the parent's.
    pub site: SiteOverrides,
    /// Theme values replacing the parent's.
    pub theme: ThemeOverrides,
}

/// Site fields a child may override. Unset fields keep the parent's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteOverrides {
    /// Site name.
    pub name: Option<String>,
    /// Public base URL.
    pub url: Option<String>,
    /// Output directory.
    pub output: Option<String>,
    /// Favicon path.
    pub favicon: Option<String>,
    /// Repository link.
    pub repository: Option<String>,
    /// Edit link path segment.
    pub edit_path: Option<String>,
}

impl SiteOverrides {
    /// Layer these overrides onto `site`, field by field.
    pub fn apply(&self, site: &mut SiteSettings) {
        let fields = [
            (&self.url, &mut site.url),
            (&self.output, &mut site.output),
            (&self.favicon, &mut site.favicon),
            (&self.repository, &mut site.repository),
            (&self.edit_path, &mut site.edit_path),
        ];
        for (value, target) in fields {
            if value.is_some() {
                target.clone_from(value);
            }
        }
        if let Some(name) = &self.name {
            site.name.clone_from(name);
        }
    }
}

/// Theme values a child may override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeOverrides {
    /// Theme location.
    pub location: Option<Location>,
    /// Settings merged per top-level key.
    pub settings: toml::Table,
}

impl ThemeOverrides {
    fn resolve_paths(&mut self, base: &Path) {
        if let Some(location) = &mut self.location {
            location.resolve_paths(base);
        }
    }

    /// Layer these overrides onto `theme`.
    ///
    /// Each top-level settings key replaces the parent's value as a whole;
    /// nested tables are not merged.
    pub fn apply(&self, theme: &mut ThemeSettings) {
        if let Some(location) = &self.location {
            theme.location = Some(location.clone());
        }
        for (key, value) in &self.settings {
            theme.settings.insert(key.clone(), value.clone());
        }
    }
}

//! Explicit navigation declarations.
//!
//! ```toml
//! nav = [
//!     "index.md",
//!     "guides/",
//!     { title = "Install", path = "install.md" },
//!     { "Upgrading" = "upgrade.md" },
//!     { path = "config.md", children = ["config/root.md", "config/child.md"] },
//!     { section = "Reference", items = ["api.md", "cli.md"] },
//!     { title = "GitHub", url = "https://github.com/org/repo" },
//! ]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Ordered navigation forest for one source.
pub type NavSpec = Vec<NavItem>;

/// One entry of an explicit navigation declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavItem {
    /// Bare page path, or a directory reference when it ends with `/`.
    Path(String),
    /// Non-clickable heading grouping its items.
    Section {
        /// Heading text.
        section: String,
        /// Grouped entries.
        #[serde(default)]
        items: Vec<NavItem>,
    },
    /// Link to an address outside the site.
    External {
        /// Display title.
        title: String,
        /// Target URL.
        url: String,
    },
    /// Page link with an optional title and nested entries.
    Link {
        /// Page path, relative to the content root.
        path: String,
        /// Display title overriding the page title.
        #[serde(default)]
        title: Option<String>,
        /// Nested entries.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NavItem>,
    },
    /// `{ "Title" = "path" }` shorthand. Must hold exactly one entry.
    Titled(BTreeMap<String, String>),
}

impl NavItem {
    /// Check entries recursively; `field` is the path of this item.
    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Path(path) => require_path(path, field),
            Self::Section { items, .. } => validate_items(items, &format!("{field}.items")),
            Self::External { url, .. } => {
                if url.trim().is_empty() {
                    return Err(ConfigError::validation(format!("{field}.url"), "cannot be empty"));
                }
                Ok(())
            }
            Self::Link { path, children, .. } => {
                require_path(path, &format!("{field}.path"))?;
                validate_items(children, &format!("{field}.children"))
            }
            Self::Titled(entries) => {
                let mut iter = entries.values();
                match (iter.next(), iter.next()) {
                    (Some(path), None) => require_path(path, field),
                    _ => Err(ConfigError::validation(
                        field,
                        "titled entry must map exactly one title to one path",
                    )),
                }
            }
        }
    }
}

/// Validate a list of items under `field`.
pub(crate) fn validate_items(items: &[NavItem], field: &str) -> Result<(), ConfigError> {
    for (i, item) in items.iter().enumerate() {
        item.validate(&format!("{field}[{i}]"))?;
    }
    Ok(())
}

fn require_path(path: &str, field: &str) -> Result<(), ConfigError> {
    if path.trim().is_empty() {
        return Err(ConfigError::validation(field, "path cannot be empty"));
    }
    Ok(())
}

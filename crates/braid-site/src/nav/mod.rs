//! Navigation tree construction.
//!
//! A source's tree comes from one of two generators:
//!
//! - **auto**: mirrors the content directory. Directories become sections, a
//!   directory `index` page becomes the section's landing link, and a page
//!   sharing its stem with a directory (`configuration.md` next to
//!   `configuration/`) takes that directory's entries as its children.
//! - **explicit**: follows a declared [`NavSpec`] in order, expanding
//!   directory references with the auto generator.

mod auto;
mod explicit;
mod tree;

use std::path::PathBuf;

use serde::Serialize;

use braid_config::NavSpec;
use braid_source::PageRecord;

use tree::DirNode;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    /// Page of the same source.
    Page {
        /// Page URL.
        url_path: String,
        /// Page file, relative to the content directory.
        relative_path: PathBuf,
    },
    /// Address outside the site.
    External {
        /// Target URL.
        url: String,
    },
}

impl LinkTarget {
    fn page(page: &PageRecord) -> Self {
        Self::Page {
            url_path: page.url_path.clone(),
            relative_path: page.relative_path.clone(),
        }
    }
}

/// Clickable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    /// Display title.
    pub title: String,
    /// Link target.
    pub target: LinkTarget,
    /// Nested entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavNode>,
}

/// Non-clickable heading grouping entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavSection {
    /// Heading text.
    pub title: String,
    /// Grouped entries.
    pub items: Vec<NavNode>,
}

/// One node of a navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavNode {
    /// Clickable entry.
    Link(NavLink),
    /// Heading.
    Section(NavSection),
}

impl NavNode {
    /// Display title of the node.
    pub fn title(&self) -> &str {
        match self {
            Self::Link(link) => &link.title,
            Self::Section(section) => &section.title,
        }
    }

    /// Nested nodes: a link's children or a section's items.
    pub fn children(&self) -> &[NavNode] {
        match self {
            Self::Link(link) => &link.children,
            Self::Section(section) => &section.items,
        }
    }

    fn set_title(&mut self, title: String) {
        match self {
            Self::Link(link) => link.title = title,
            Self::Section(section) => section.title = title,
        }
    }

    fn set_children(&mut self, children: Vec<NavNode>) {
        match self {
            Self::Link(link) => link.children = children,
            Self::Section(section) => section.items = children,
        }
    }
}

/// Ordered navigation forest of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NavTree {
    /// Top-level nodes.
    pub items: Vec<NavNode>,
}

impl NavTree {
    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// URL paths of every page link, depth first in display order.
    pub fn page_urls(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [NavNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                if let NavNode::Link(NavLink {
                    target: LinkTarget::Page { url_path, .. },
                    ..
                }) = node
                {
                    out.push(url_path);
                }
                walk(node.children(), out);
            }
        }

        let mut out = Vec::new();
        walk(&self.items, &mut out);
        out
    }
}

/// Navigation error.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// An explicit entry names a page or directory that does not exist.
    #[error("Navigation of source '{source_name}' references missing path '{path}'")]
    DanglingReference {
        /// Source whose navigation is being built.
        source_name: String,
        /// Path as declared.
        path: String,
    },
}

/// Build the navigation tree of one source.
///
/// Without `nav`, the tree is generated from the directory layout of
/// `pages`; otherwise it follows `nav` in declaration order.
///
/// # Errors
///
/// Returns `NavError::DanglingReference` when an explicit entry resolves to
/// neither a page nor a directory holding pages.
pub fn build_nav(
    source_name: &str,
    pages: &[PageRecord],
    nav: Option<&NavSpec>,
) -> Result<NavTree, NavError> {
    let tree = DirNode::from_pages(pages);
    let items = match nav {
        None => auto::root_nodes(&tree),
        Some(spec) => explicit::ExplicitNav::new(source_name, pages, &tree).build(spec)?,
    };
    Ok(NavTree { items })
}

//! Navigation following a declared [`NavSpec`].

use std::collections::HashMap;
use std::path::Path;

use braid_config::{NavItem, NavSpec};
use braid_source::PageRecord;

use super::tree::{DirNode, normalize_ref};
use super::{LinkTarget, NavError, NavLink, NavNode, NavSection, auto};

/// What a declared path resolves to.
enum Target<'t, 'a> {
    Page(&'a PageRecord),
    Dir(&'t DirNode<'a>),
}

pub(crate) struct ExplicitNav<'t, 'a> {
    source_name: &'t str,
    by_path: HashMap<&'a Path, &'a PageRecord>,
    tree: &'t DirNode<'a>,
}

impl<'t, 'a> ExplicitNav<'t, 'a> {
    pub fn new(source_name: &'t str, pages: &'a [PageRecord], tree: &'t DirNode<'a>) -> Self {
        Self {
            source_name,
            by_path: pages
                .iter()
                .map(|p| (p.relative_path.as_path(), p))
                .collect(),
            tree,
        }
    }

    pub fn build(&self, spec: &NavSpec) -> Result<Vec<NavNode>, NavError> {
        self.items(spec)
    }

    fn items(&self, items: &[NavItem]) -> Result<Vec<NavNode>, NavError> {
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            if let Some(node) = self.item(item)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn item(&self, item: &NavItem) -> Result<Option<NavNode>, NavError> {
        match item {
            NavItem::Path(path) => self.reference(path, None, &[]),
            NavItem::Link {
                path,
                title,
                children,
            } => self.reference(path, title.as_deref(), children),
            NavItem::Titled(entries) => match entries.iter().next() {
                Some((title, path)) => self.reference(path, Some(title.as_str()), &[]),
                None => Ok(None),
            },
            NavItem::Section { section, items } => {
                let items = self.items(items)?;
                Ok((!items.is_empty()).then(|| {
                    NavNode::Section(NavSection {
                        title: section.clone(),
                        items,
                    })
                }))
            }
            NavItem::External { title, url } => Ok(Some(NavNode::Link(NavLink {
                title: title.clone(),
                target: LinkTarget::External { url: url.clone() },
                children: Vec::new(),
            }))),
        }
    }

    /// Node for a declared page or directory path.
    ///
    /// Declared `children` replace a directory's generated entries. A
    /// directory with nothing to list is left out.
    fn reference(
        &self,
        declared: &str,
        title: Option<&str>,
        children: &[NavItem],
    ) -> Result<Option<NavNode>, NavError> {
        let mut node = match self.lookup(declared)? {
            Target::Page(page) => NavNode::Link(NavLink {
                title: page.title.clone(),
                target: LinkTarget::page(page),
                children: Vec::new(),
            }),
            Target::Dir(dir) => match auto::dir_node(dir) {
                Some(node) => node,
                None => {
                    let items = self.items(children)?;
                    if items.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(NavNode::Section(NavSection {
                        title: title.map_or_else(|| auto::section_title(&dir.name), str::to_owned),
                        items,
                    })));
                }
            },
        };

        if let Some(title) = title {
            node.set_title(title.to_owned());
        }
        if !children.is_empty() {
            node.set_children(self.items(children)?);
        }
        Ok(Some(node))
    }

    fn lookup(&self, declared: &str) -> Result<Target<'t, 'a>, NavError> {
        let (path, is_dir) = normalize_ref(declared);

        if !is_dir {
            if let Some(&page) = self.by_path.get(path.as_path()) {
                return Ok(Target::Page(page));
            }
            let mut with_ext = path.clone().into_os_string();
            with_ext.push(".md");
            if let Some(&page) = self.by_path.get(Path::new(&with_ext)) {
                return Ok(Target::Page(page));
            }
        }

        self.tree
            .find(&path)
            .map(Target::Dir)
            .ok_or_else(|| NavError::DanglingReference {
                source_name: self.source_name.to_owned(),
                path: declared.to_owned(),
            })
    }
}

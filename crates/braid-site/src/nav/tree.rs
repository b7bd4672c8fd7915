//! Directory tree rebuilt from scanned pages.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use braid_source::PageRecord;

/// One directory and the pages beneath it.
#[derive(Debug, Default)]
pub(crate) struct DirNode<'a> {
    /// Raw directory name; empty for the content root.
    pub name: String,
    /// Pages directly inside this directory, in scan order.
    pub files: Vec<&'a PageRecord>,
    /// Subdirectories by raw name.
    pub dirs: BTreeMap<String, DirNode<'a>>,
}

impl<'a> DirNode<'a> {
    /// Group pages by their containing directory.
    pub fn from_pages(pages: &'a [PageRecord]) -> Self {
        let mut root = Self::default();
        for page in pages {
            let mut node = &mut root;
            for component in page.directory_path.components() {
                let Component::Normal(name) = component else {
                    continue;
                };
                let name = name.to_string_lossy().into_owned();
                node = node.dirs.entry(name.clone()).or_insert_with(|| Self {
                    name,
                    ..Self::default()
                });
            }
            node.files.push(page);
        }
        root
    }

    /// Directory at `relative`, if it holds any pages.
    pub fn find(&self, relative: &Path) -> Option<&Self> {
        let mut node = self;
        for component in relative.components() {
            match component {
                Component::Normal(name) => node = node.dirs.get(name.to_str()?)?,
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(node)
    }

    /// The directory's `index` page.
    pub fn index(&self) -> Option<&'a PageRecord> {
        self.files.iter().copied().find(|p| p.is_index)
    }

    /// Pages other than the index.
    pub fn pages(&self) -> impl Iterator<Item = &'a PageRecord> + '_ {
        self.files.iter().copied().filter(|p| !p.is_index)
    }
}

/// Normalize a declared nav path: `./` and leading `/` removed.
///
/// Returns the path and whether it was written as a directory.
pub(crate) fn normalize_ref(declared: &str) -> (PathBuf, bool) {
    let trimmed = declared.trim();
    let is_dir = trimmed.ends_with('/');
    let path: PathBuf = Path::new(trimmed.trim_start_matches('/'))
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    (path, is_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_source::FrontMatter;

    fn page(path: &str) -> PageRecord {
        let relative_path = PathBuf::from(path);
        PageRecord {
            directory_path: relative_path.parent().map(Path::to_path_buf).unwrap_or_default(),
            is_index: relative_path.file_stem().is_some_and(|s| s == "index"),
            relative_path,
            url_path: String::new(),
            title: String::new(),
            front_matter: FrontMatter::default(),
        }
    }

    #[test]
    fn test_from_pages_groups_by_directory() {
        let pages = vec![page("index.md"), page("a/b/c.md"), page("a/index.md"), page("x.md")];
        let tree = DirNode::from_pages(&pages);

        assert_eq!(tree.files.len(), 2);
        assert_eq!(tree.index().map(|p| p.relative_path.clone()), Some(PathBuf::from("index.md")));
        let a = tree.find(Path::new("a")).unwrap();
        assert_eq!(a.name, "a");
        assert!(a.index().is_some());
        assert_eq!(a.pages().count(), 0);
        assert_eq!(tree.find(Path::new("a/b")).unwrap().files.len(), 1);
        assert!(tree.find(Path::new("missing")).is_none());
        assert!(tree.find(Path::new("../a")).is_none());
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("./guides/"), (PathBuf::from("guides"), true));
        assert_eq!(normalize_ref("/a/b.md"), (PathBuf::from("a/b.md"), false));
        assert_eq!(normalize_ref(" index.md "), (PathBuf::from("index.md"), false));
    }
}

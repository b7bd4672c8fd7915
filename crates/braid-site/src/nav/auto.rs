//! Navigation generated from the directory layout.

use braid_source::{EntryName, PageRecord, titlecase_from_slug};

use super::tree::DirNode;
use super::{LinkTarget, NavLink, NavNode, NavSection};

type SortKey = (bool, u64, String, String);

enum Entry<'t, 'a> {
    Page(&'a PageRecord),
    Dir(&'t DirNode<'a>),
    /// Page whose stem matches a sibling directory.
    Merged(&'a PageRecord, &'t DirNode<'a>),
}

/// Top-level nodes of a source: the root index first, then its entries.
pub(crate) fn root_nodes(tree: &DirNode<'_>) -> Vec<NavNode> {
    entries(tree, true)
}

/// The node a directory contributes to its parent's entries.
///
/// A visible `index` page makes the directory a landing link; otherwise it is
/// a section. Directories without visible pages contribute nothing.
pub(crate) fn dir_node(dir: &DirNode<'_>) -> Option<NavNode> {
    let children = entries(dir, false);
    match dir.index().filter(|p| !p.is_hidden()) {
        Some(index) => Some(page_link(index, children)),
        None if children.is_empty() => None,
        None => Some(NavNode::Section(NavSection {
            title: section_title(&dir.name),
            items: children,
        })),
    }
}

/// Ordered nodes for the contents of `dir`.
fn entries(dir: &DirNode<'_>, with_index: bool) -> Vec<NavNode> {
    let mut nodes = Vec::new();
    if with_index && let Some(index) = dir.index().filter(|p| !p.is_hidden()) {
        nodes.push(page_link(index, Vec::new()));
    }

    let mut dirs: Vec<Option<&DirNode<'_>>> = dir.dirs.values().map(Some).collect();
    let mut keyed: Vec<(SortKey, Entry<'_, '_>)> = Vec::new();

    for page in dir.pages().filter(|p| !p.is_hidden()) {
        let file_name = page.file_name();
        let name = EntryName::parse(&file_name);
        let twin = dirs.iter_mut().find(|d| {
            d.is_some_and(|d| EntryName::parse(&d.name).stem == name.stem)
        });
        let entry = match twin.and_then(Option::take) {
            Some(twin) => Entry::Merged(page, twin),
            None => Entry::Page(page),
        };
        keyed.push((name.sort_key(&file_name), entry));
    }
    for sub in dirs.into_iter().flatten() {
        keyed.push((EntryName::parse(&sub.name).sort_key(&sub.name), Entry::Dir(sub)));
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    nodes.extend(keyed.into_iter().filter_map(|(_, entry)| match entry {
        Entry::Page(page) => Some(page_link(page, Vec::new())),
        Entry::Merged(page, sub) => Some(page_link(page, entries(sub, true))),
        Entry::Dir(sub) => dir_node(sub),
    }));
    nodes
}

fn page_link(page: &PageRecord, children: Vec<NavNode>) -> NavNode {
    NavNode::Link(NavLink {
        title: page.title.clone(),
        target: LinkTarget::page(page),
        children,
    })
}

pub(crate) fn section_title(dir_name: &str) -> String {
    titlecase_from_slug(EntryName::parse(dir_name).stem)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::nav::{NavTree, build_nav};
    use braid_source::Scanner;
    use pretty_assertions::assert_eq;

    fn build(files: &[(&str, &str)]) -> NavTree {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let pages = Scanner::new(dir.path().to_path_buf(), "/").scan().unwrap();
        build_nav("docs", &pages, None).unwrap()
    }

    /// `title` for links, `[title]` for sections, children indented.
    fn outline(nodes: &[NavNode]) -> Vec<String> {
        fn walk(nodes: &[NavNode], depth: usize, out: &mut Vec<String>) {
            for node in nodes {
                let label = match node {
                    NavNode::Link(link) => link.title.clone(),
                    NavNode::Section(section) => format!("[{}]", section.title),
                };
                out.push(format!("{}{label}", "  ".repeat(depth)));
                walk(node.children(), depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(nodes, 0, &mut out);
        out
    }

    #[test]
    fn test_file_and_directory_merge() {
        let tree = build(&[
            ("configuration.md", "# Configuration"),
            ("configuration/root.md", "# Root"),
            ("configuration/child.md", "# Child"),
        ]);

        assert_eq!(tree.items.len(), 1);
        let NavNode::Link(link) = &tree.items[0] else {
            panic!("expected a link");
        };
        assert_eq!(link.title, "Configuration");
        assert_eq!(link.children.len(), 2);
        assert_eq!(outline(&tree.items), vec!["Configuration", "  Child", "  Root"]);
    }

    #[test]
    fn test_numeric_prefix_ordering() {
        let tree = build(&[
            ("03-advanced.md", ""),
            ("01-installation.md", ""),
            ("02-configuration.md", ""),
        ]);

        assert_eq!(outline(&tree.items), vec!["Installation", "Configuration", "Advanced"]);
        assert_eq!(
            tree.page_urls(),
            vec!["/installation", "/configuration", "/advanced"]
        );
    }

    #[test]
    fn test_prefixed_entries_before_plain() {
        let tree = build(&[("zeta.md", ""), ("alpha.md", ""), ("10-last.md", ""), ("2-second.md", "")]);
        assert_eq!(outline(&tree.items), vec!["Second", "Last", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_directory_becomes_section() {
        let tree = build(&[("guides/install.md", "# Install"), ("guides/upgrade.md", "# Upgrade")]);
        assert_eq!(outline(&tree.items), vec!["[Guides]", "  Install", "  Upgrade"]);
    }

    #[test]
    fn test_directory_index_is_landing_link() {
        let tree = build(&[
            ("index.md", "# Welcome"),
            ("02-guides/index.md", "# Guides Overview"),
            ("02-guides/01-install.md", "# Install"),
            ("01-intro.md", "# Intro"),
        ]);

        assert_eq!(
            outline(&tree.items),
            vec!["Welcome", "Intro", "Guides Overview", "  Install"]
        );
        assert_eq!(tree.page_urls(), vec!["/", "/intro", "/guides", "/guides/install"]);
    }

    #[test]
    fn test_hidden_pages_excluded() {
        let tree = build(&[
            ("visible.md", ""),
            ("secret.md", "---\nhidden: true\n---\n"),
            ("internal/notes.md", "---\nhidden: true\n---\n"),
        ]);
        assert_eq!(outline(&tree.items), vec!["Visible"]);
    }

    #[test]
    fn test_hidden_index_leaves_section() {
        let tree = build(&[
            ("api/index.md", "---\nhidden: true\n---\n"),
            ("api/auth.md", "# Auth"),
        ]);
        assert_eq!(outline(&tree.items), vec!["[Api]", "  Auth"]);
    }

    #[test]
    fn test_hidden_twin_does_not_absorb_directory() {
        let tree = build(&[
            ("reference.md", "---\nhidden: true\n---\n"),
            ("reference/cli.md", "# CLI"),
        ]);
        assert_eq!(outline(&tree.items), vec!["[Reference]", "  CLI"]);
    }

    #[test]
    fn test_every_visible_page_listed_once() {
        let files = [
            ("index.md", ""),
            ("a.md", ""),
            ("a/one.md", ""),
            ("a/deep/two.md", ""),
            ("b/index.md", ""),
            ("b/three.md", ""),
            ("c/d/e/four.md", ""),
        ];
        let tree = build(&files);

        let mut urls = tree.page_urls();
        urls.sort_unstable();
        assert_eq!(
            urls,
            vec!["/", "/a", "/a/deep/two", "/a/one", "/b", "/b/three", "/c/d/e/four"]
        );
    }

    #[test]
    fn test_section_title_strips_prefix() {
        assert_eq!(section_title("03-user-guides"), "User Guides");
        assert_eq!(section_title("api"), "Api");
    }
}

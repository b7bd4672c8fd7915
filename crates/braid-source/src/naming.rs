//! File name conventions: numeric ordering prefixes and derived titles.

/// File or directory name split into its ordering prefix and display stem.
///
/// `02-configuration.md` has prefix `Some(2)` and stem `configuration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName<'a> {
    /// Numeric prefix, if the name starts with `NN-` or `NN_`.
    pub order: Option<u64>,
    /// Name without prefix and without markdown extension.
    pub stem: &'a str,
}

impl<'a> EntryName<'a> {
    /// Parse a file or directory name.
    pub fn parse(name: &'a str) -> Self {
        let name = strip_markdown_extension(name);
        let (order, stem) = split_numeric_prefix(name);
        Self { order, stem }
    }

    /// Sort key: prefixed entries first by number, then by stem, then by
    /// the raw name to keep the order total.
    pub fn sort_key(&self, raw: &str) -> (bool, u64, String, String) {
        (
            self.order.is_none(),
            self.order.unwrap_or(0),
            self.stem.to_lowercase(),
            raw.to_owned(),
        )
    }
}

/// Markdown file extensions recognized as pages.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Drop a `.md`/`.markdown` extension, in any case.
pub fn strip_markdown_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if MARKDOWN_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)) => {
            stem
        }
        _ => name,
    }
}

/// Split `NN-rest` into `(Some(NN), "rest")`.
///
/// Names made only of digits, or with nothing after the separator, are
/// left alone.
pub fn split_numeric_prefix(name: &str) -> (Option<u64>, &str) {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, name);
    }
    let rest = &name[digits..];
    let Some(stem) = rest.strip_prefix(['-', '_']) else {
        return (None, name);
    };
    if stem.is_empty() {
        return (None, name);
    }
    match name[..digits].parse() {
        Ok(order) => (Some(order), stem),
        Err(_) => (None, name),
    }
}

/// Convert a slug to a display title.
///
/// `"getting-started"` becomes `"Getting Started"`.
pub fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

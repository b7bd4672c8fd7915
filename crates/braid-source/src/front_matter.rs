//! Page front matter.
//!
//! Extraction sits behind [`FrontMatterParser`] so a renderer can supply its
//! own; [`YamlFrontMatter`] handles the common `---` fenced YAML block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata declared at the top of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    /// Display title.
    pub title: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Exclude from auto-generated navigation.
    pub hidden: bool,
    /// Replacement for the last URL segment.
    pub slug: Option<String>,
    /// Every other key, untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Front matter parse failure.
#[derive(Debug, thiserror::Error)]
#[error("Invalid front matter: {0}")]
pub struct FrontMatterError(pub String);

/// Extracts [`FrontMatter`] from raw page text.
pub trait FrontMatterParser: Send + Sync {
    /// Parse the front matter of `content`.
    ///
    /// Pages without front matter yield the default value.
    ///
    /// # Errors
    ///
    /// Returns an error if a front matter block exists but is malformed.
    fn parse(&self, content: &str) -> Result<FrontMatter, FrontMatterError>;
}

/// YAML between `---` fences on the first lines of the page.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFrontMatter;

impl FrontMatterParser for YamlFrontMatter {
    fn parse(&self, content: &str) -> Result<FrontMatter, FrontMatterError> {
        let Some((block, _)) = split_front_matter(content) else {
            return Ok(FrontMatter::default());
        };
        if block.trim().is_empty() {
            return Ok(FrontMatter::default());
        }
        serde_yaml::from_str(block).map_err(|e| FrontMatterError(e.to_string()))
    }
}

/// Split `content` into the fenced block and the text after it.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Text after the front matter block, or the whole page if there is none.
pub fn body(content: &str) -> &str {
    split_front_matter(content).map_or(content, |(_, body)| body)
}

//! Tag identity: hash normalization, canonical form and hierarchy matching.
//!
//! A tag is written `#name`, where `name` may contain `/` to form a
//! hierarchy (`#project/alpha` is a sub-tag of `#project`). Identity is
//! case-insensitive: `#Project` and `#project` are the same tag.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// One `#`, then anything except whitespace, ASCII punctuation other than
/// `/`, `-`, `_`, and the General / Supplemental Punctuation blocks.
static TAG_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^#[^\x{2000}-\x{206F}\x{2E00}-\x{2E7F}'!"\#$%\&()*+,.:;<=>?@\^`{|}\~\[\]\\\s]+$"#,
    )
    .expect("tag body pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    tag: String,
    name: String,
    canonical: String,
    canonical_prefix: String,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        let tag = Self::to_tag(name);
        let canonical = tag.to_lowercase();
        let canonical_prefix = format!("{}/", canonical);
        let name = tag[1..].to_string();

        Tag {
            tag,
            name,
            canonical,
            canonical_prefix,
        }
    }

    /// Hash-prefixed form, e.g. `#Project/Alpha`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Bare name without the leading hash.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased hash-prefixed form used for identity comparison.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Canonical form plus the hierarchy separator.
    pub fn canonical_prefix(&self) -> &str {
        &self.canonical_prefix
    }

    /// True if `text` is this tag or one of its sub-tags, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        let value = text.to_lowercase();
        value == self.canonical || value.starts_with(&self.canonical_prefix)
    }

    /// Collapse redundant leading hashes and make sure exactly one is present.
    pub fn to_tag(name: &str) -> String {
        let mut name = name;
        while name.starts_with("##") {
            name = &name[1..];
        }
        if name.starts_with('#') {
            name.to_string()
        } else {
            format!("#{}", name)
        }
    }

    pub fn to_name(name: &str) -> String {
        Self::to_tag(name)[1..].to_string()
    }

    pub fn canonical_of(name: &str) -> String {
        Self::to_tag(name).to_lowercase()
    }

    /// True if `s` is a well-formed tag token once hash-normalized.
    pub fn is_tag(s: &str) -> bool {
        TAG_BODY.is_match(&Self::to_tag(s))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

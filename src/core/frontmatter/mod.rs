//! Tag and alias rewriting inside a document's YAML front matter.
//!
//! Values are read through the plain `serde_yml` view and written back
//! through the span-preserving CST in [`yaml`], so only the scalars whose
//! value actually changes are touched.

pub mod yaml;

use regex::Regex;
use serde_yml::Value;
use std::ops::Range;
use std::panic;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::replacement::Replacement;

use yaml::{Document, Edits, Node};

static TAGS_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^tags?$").expect("tags field pattern is valid"));
static ALIASES_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^alias(es)?$").expect("aliases field pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Tags,
    Aliases,
}

impl FieldKind {
    /// Which list semantics a top-level key carries, if any.
    pub fn classify(key: &str) -> Option<Self> {
        if TAGS_FIELD.is_match(key) {
            Some(FieldKind::Tags)
        } else if ALIASES_FIELD.is_match(key) {
            Some(FieldKind::Aliases)
        } else {
            None
        }
    }

    pub fn is_alias(self) -> bool {
        self == FieldKind::Aliases
    }
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace() || c == '\u{FEFF}')
}

/// Byte range of the front-matter block, between the opening and closing
/// `---` lines.
///
/// Returns `None` unless only whitespace or a byte-order mark precedes the
/// opening delimiter, a closing delimiter exists, and the block is non-blank
/// and ends with a newline.
pub fn split_front_matter(text: &str) -> Option<Range<usize>> {
    let mut pos = 0;
    let mut open = None;

    for line in text.split_inclusive('\n') {
        let start = pos;
        pos += line.len();
        let content = line.strip_suffix('\n').unwrap_or(line);
        let content = if start == 0 {
            content.strip_prefix('\u{FEFF}').unwrap_or(content)
        } else {
            content
        };
        if content != "---" && content != "---\r" {
            continue;
        }

        match open {
            None => {
                if !is_blank(&text[..start]) {
                    return None;
                }
                open = Some(pos);
            }
            Some(block_start) => {
                let block = &text[block_start..start];
                return (!is_blank(block) && block.ends_with('\n')).then_some(block_start..start);
            }
        }
    }

    None
}

/// Apply `replace` to the tag and alias fields of `text`'s front matter.
///
/// Text without a well-formed front-matter block comes back unchanged. A
/// block that is not valid YAML is an error and nothing is rewritten.
pub fn replace_front_matter_text(text: &str, replace: &mut Replacement) -> Result<String> {
    let Some(range) = split_front_matter(text) else {
        return Ok(text.to_string());
    };
    let block = &text[range.clone()];

    let view = parse_yaml(block).map_err(Error::metadata_parse_failed)?;
    let Value::Mapping(fields) = view else {
        return Ok(text.to_string());
    };

    let document = Document::parse(block);
    let mut edits = Edits::default();

    for (key, value) in fields.iter() {
        let Some(key) = key.as_str() else {
            continue;
        };
        let Some(kind) = FieldKind::classify(key) else {
            continue;
        };
        let Some(node) = document.get(key) else {
            continue;
        };
        rewrite_field(key, node, value, kind.is_alias(), replace, &mut edits);
    }

    if edits.is_empty() {
        return Ok(text.to_string());
    }

    let rendered = document.render(&edits);
    parse_yaml(&rendered).map_err(|e| {
        Error::metadata_parse_failed(format!("rewritten front matter does not parse: {}", e))
    })?;

    let mut out = String::with_capacity(text.len() + rendered.len() - block.len());
    out.push_str(&text[..range.start]);
    out.push_str(&rendered);
    out.push_str(&text[range.end..]);
    Ok(out)
}

/// Parse a YAML block, treating a parser panic as a parse error.
///
/// The underlying scanner can panic on some malformed input; one bad
/// document must not take the whole batch down with it.
fn parse_yaml(block: &str) -> std::result::Result<Value, String> {
    match panic::catch_unwind(|| serde_yml::from_str::<Value>(block)) {
        Ok(parsed) => parsed.map_err(|e| e.to_string()),
        Err(_) => Err("YAML parser failed on malformed input".to_string()),
    }
}

fn rewrite_field(
    key: &str,
    node: &Node,
    value: &Value,
    is_alias: bool,
    replace: &mut Replacement,
    edits: &mut Edits,
) {
    match (value, node) {
        // Alias references follow whatever their anchor becomes.
        (_, Node::Alias(_)) => {}
        (Value::String(field), Node::Scalar(scalar)) if !field.is_empty() => {
            let after = replace.in_text_list(field, is_alias);
            if after == *field {
                return;
            }
            if scalar.value == *field {
                edits.set_scalar(scalar, &after);
            } else {
                log_status!("frontmatter", "Skipping '{}': value could not be located", key);
            }
        }
        (Value::Sequence(items), Node::Sequence(sequence)) if !items.is_empty() => {
            let updated = replace.in_array(items, false, is_alias);
            for (index, (before, after)) in items.iter().zip(&updated).enumerate() {
                if before == after {
                    continue;
                }
                let Value::String(new_value) = after else {
                    continue;
                };
                match sequence.items.get(index) {
                    Some(Node::Scalar(scalar)) if before.as_str() == Some(scalar.value.as_str()) => {
                        edits.set_scalar(scalar, new_value);
                    }
                    _ => {
                        log_status!(
                            "frontmatter",
                            "Skipping '{}' item {}: value could not be located",
                            key,
                            index
                        );
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;

    fn foo_to_bar() -> Replacement {
        Replacement::new(Tag::new("foo"), Tag::new("bar"))
    }

    fn block_of(text: &str) -> &str {
        let range = split_front_matter(text).expect("front matter present");
        &text[range]
    }

    fn view_of(text: &str) -> Value {
        serde_yml::from_str(block_of(text)).expect("front matter parses")
    }

    #[test]
    fn classify_fields() {
        assert_eq!(FieldKind::classify("tags"), Some(FieldKind::Tags));
        assert_eq!(FieldKind::classify("Tag"), Some(FieldKind::Tags));
        assert_eq!(FieldKind::classify("ALIASES"), Some(FieldKind::Aliases));
        assert_eq!(FieldKind::classify("alias"), Some(FieldKind::Aliases));
        assert_eq!(FieldKind::classify("tagged"), None);
        assert_eq!(FieldKind::classify("aliasess"), None);
    }

    #[test]
    fn split_requires_leading_and_closing_delimiters() {
        let text = "---\ntags: foo\n---\nbody";
        assert_eq!(split_front_matter(text), Some(4..14));

        assert_eq!(split_front_matter("  \n---\r\na: 1\r\n---\r\n"), Some(8..14));
        assert_eq!(split_front_matter("text\n---\na: 1\n---\n"), None);
        assert_eq!(split_front_matter("---\na: 1\n"), None);
        assert_eq!(split_front_matter("---\n \n---\n"), None);
        assert_eq!(split_front_matter("---\n---\n"), None);
        assert_eq!(split_front_matter("----\na: 1\n---\n"), None);
    }

    #[test]
    fn rewrites_tag_and_alias_fields() {
        let text = "---\ntags: [foo, foo/bar]\naliases: \"hello, #foo, world\"\n---\nbody #foo\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(
            out,
            "---\ntags: [bar, bar/bar]\naliases: \"hello, #bar, world\"\n---\nbody #foo\n"
        );
    }

    #[test]
    fn untouched_fields_and_formatting_survive() {
        let text = "---\ntitle:   Foo   # keep\ntags:\n  - foo   # first\n  - other\nfoo: foo\n---\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(
            out,
            "---\ntitle:   Foo   # keep\ntags:\n  - bar   # first\n  - other\nfoo: foo\n---\n"
        );
    }

    #[test]
    fn no_matching_fields_returns_identical_text() {
        let text = "---\ntags: [one, two]\naliases: plain\n---\n#foo\n";
        let mut replace = foo_to_bar();
        assert_eq!(replace_front_matter_text(text, &mut replace).unwrap(), text);
    }

    #[test]
    fn string_tag_list_keeps_separators() {
        let text = "---\ntags: foo,  Foo/x other\n---\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(out, "---\ntags: bar,  bar/x other\n---\n");
    }

    #[test]
    fn hash_prefixed_values_are_quoted() {
        let text = "---\ntags: [\"#foo\", '#foo/x']\n---\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(out, "---\ntags: [\"#bar\", '#bar/x']\n---\n");
    }

    #[test]
    fn alias_arrays_only_touch_hash_entries() {
        let text = "---\naliases:\n  - foo\n  - \"#foo\"\n---\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(out, "---\naliases:\n  - foo\n  - \"#bar\"\n---\n");
    }

    #[test]
    fn block_scalars_rewrite_into_valid_yaml() {
        let text = "---\ntags: |\n  foo\n  foo/bar\naliases: |\n  hello, #foo, world\n---\nbody";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();

        let view = view_of(&out);
        assert_eq!(view["tags"].as_str(), Some("bar\nbar/bar\n"));
        assert_eq!(view["aliases"].as_str(), Some("hello, #bar, world\n"));
        assert!(out.ends_with("---\nbody"));
    }

    #[test]
    fn anchored_list_carries_alias_reference() {
        let text = "---\ntags: &t\n  - foo\n  - foo/bar\naliases: *t\n---\nbody";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();

        assert!(out.contains("aliases: *t\n"));
        let view = view_of(&out);
        let expected: Value = serde_yml::from_str("[bar, bar/bar]").unwrap();
        assert_eq!(view["tags"], expected);
        assert_eq!(view["aliases"], expected);
    }

    #[test]
    fn null_and_empty_values_are_ignored() {
        let text = "---\ntags:\naliases: []\nTag: \"\"\n---\n";
        let mut replace = foo_to_bar();
        assert_eq!(replace_front_matter_text(text, &mut replace).unwrap(), text);
    }

    #[test]
    fn non_mapping_front_matter_is_left_alone() {
        let text = "---\n- foo\n- bar\n---\n";
        let mut replace = foo_to_bar();
        assert_eq!(replace_front_matter_text(text, &mut replace).unwrap(), text);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let text = "---\ntags: [foo\n---\n";
        let mut replace = foo_to_bar();
        let err = replace_front_matter_text(text, &mut replace).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::MetadataParseFailed);
    }

    #[test]
    fn yaml_scanner_panic_becomes_parse_error() {
        let text = "---\naliases\u{a0}2,      *a|\n---\nbody";
        let err = replace_front_matter_text(text, &mut foo_to_bar()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::MetadataParseFailed);
    }

    #[test]
    fn byte_order_mark_before_opening_delimiter() {
        let text = "\u{FEFF}---\ntags: foo\n---\nbody";
        assert_eq!(block_of(text), "tags: foo\n");
        assert_eq!(
            replace_front_matter_text(text, &mut foo_to_bar()).unwrap(),
            "\u{FEFF}---\ntags: bar\n---\nbody"
        );
    }

    #[test]
    fn missing_closing_delimiter_means_no_front_matter() {
        let text = "---\ntags: foo\n";
        let mut replace = foo_to_bar();
        assert_eq!(replace_front_matter_text(text, &mut replace).unwrap(), text);
    }

    #[test]
    fn crlf_front_matter() {
        let text = "---\r\ntags: [foo]\r\n---\r\nbody\r\n";
        let mut replace = foo_to_bar();
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(out, "---\r\ntags: [bar]\r\n---\r\nbody\r\n");
    }

    #[test]
    fn emoji_tags_in_lists() {
        let text = "---\ntags: [\"🤖\", \"🤖/sub\", other]\n---\n";
        let mut replace = Replacement::new(Tag::new("🤖"), Tag::new("🧠"));
        let out = replace_front_matter_text(text, &mut replace).unwrap();
        assert_eq!(out, "---\ntags: [\"🧠\", \"🧠/sub\", other]\n---\n");
    }
}

//! Rename a tag inside raw text, YAML value lists and delimited strings.
//!
//! A `Replacement` is built once per rename operation from an ordered
//! `(from, to)` pair. Every string it resolves is memoized in a
//! `ReplacementCache`, so a vault sharing the same tag vocabulary across
//! thousands of documents only pays for each distinct spelling once.

use serde::Serialize;
use serde_yml::Value;
use std::collections::{HashMap, HashSet};

use crate::tag::Tag;
use crate::tokens::TokenStream;

/// Resolved spellings for one rename operation.
///
/// The mapping from input to output is fixed for a given `(from, to)` pair,
/// so entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct ReplacementCache {
    entries: HashMap<String, String>,
}

impl ReplacementCache {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two previously distinct tags that a rename would collapse into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clash {
    /// Existing tag that would be renamed.
    pub origin: Tag,
    /// Existing tag it would become.
    pub clash: Tag,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClashSummary {
    pub origin: String,
    pub clash: String,
}

impl From<&Clash> for ClashSummary {
    fn from(clash: &Clash) -> Self {
        ClashSummary {
            origin: clash.origin.tag().to_string(),
            clash: clash.clash.tag().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Replacement {
    from: Tag,
    to: Tag,
    from_name_lower: String,
    cache: ReplacementCache,
}

impl Replacement {
    pub fn new(from: Tag, to: Tag) -> Self {
        let mut cache = ReplacementCache::default();
        cache.insert(from.tag(), to.tag());
        cache.insert(from.name(), to.name());
        cache.insert(from.canonical(), to.tag());

        let from_name_lower = from.name().to_lowercase();

        Replacement {
            from,
            to,
            from_name_lower,
            cache,
        }
    }

    pub fn from_tag(&self) -> &Tag {
        &self.from
    }

    pub fn to_tag(&self) -> &Tag {
        &self.to
    }

    pub fn cache(&self) -> &ReplacementCache {
        &self.cache
    }

    /// Splice the new tag into `text` at byte offset `pos`, replacing
    /// exactly as many bytes as the old tag's hash-prefixed form.
    pub fn in_string(&self, text: &str, pos: usize) -> String {
        let end = pos + self.from.tag().len();
        match (text.get(..pos), text.get(end..)) {
            (Some(head), Some(tail)) => {
                let mut out = String::with_capacity(text.len() + self.to.tag().len());
                out.push_str(head);
                out.push_str(self.to.tag());
                out.push_str(tail);
                out
            }
            _ => text.to_string(),
        }
    }

    /// Rename tags inside a list of YAML values.
    ///
    /// With `skip_odd`, values at odd indices are separators produced by a
    /// tokenizer and pass through untouched. In alias context only
    /// hash-prefixed, well-formed tags are candidates.
    pub fn in_array(&mut self, values: &[Value], skip_odd: bool, is_alias: bool) -> Vec<Value> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                if skip_odd && index % 2 == 1 {
                    return value.clone();
                }
                match value {
                    Value::String(entry) => Value::String(self.replace_entry(entry, is_alias)),
                    other => other.clone(),
                }
            })
            .collect()
    }

    /// Rename tags inside a delimited string, keeping every separator.
    pub fn in_text_list(&mut self, text: &str, is_alias: bool) -> String {
        let stream = if is_alias {
            TokenStream::alias_list(text)
        } else {
            TokenStream::tag_list(text)
        };
        stream.map_text(|entry| self.replace_entry(entry, is_alias))
    }

    /// First existing tag that the rename would merge into another existing
    /// tag, checking `tag_names` in the order given.
    pub fn will_merge_tags<S: AsRef<str>>(&self, tag_names: &[S]) -> Option<Clash> {
        // Case-only renames keep identities distinct.
        if self.from.canonical() == self.to.canonical() {
            return None;
        }

        let existing: HashSet<String> = tag_names
            .iter()
            .map(|name| name.as_ref().to_lowercase())
            .collect();

        tag_names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.from.matches(name))
            .find_map(|name| {
                let changed = self.in_string(name, 0);
                existing.contains(&changed.to_lowercase()).then(|| Clash {
                    origin: Tag::new(name),
                    clash: Tag::new(&changed),
                })
            })
    }

    fn replace_entry(&mut self, entry: &str, is_alias: bool) -> String {
        if entry.is_empty() {
            return String::new();
        }

        if is_alias {
            if !entry.starts_with('#') || !Tag::is_tag(entry) {
                return entry.to_string();
            }
        } else if entry.contains([' ', ',', '\n']) {
            return self.in_text_list(entry, false);
        }

        if let Some(hit) = self.cache.get(entry) {
            return hit.to_string();
        }

        let lower = entry.to_lowercase();
        if let Some(hit) = self.cache.get(&lower).map(str::to_string) {
            self.cache.insert(entry, hit.as_str());
            return hit;
        }

        let resolved = self.resolve(entry, &lower);
        self.cache.insert(entry, resolved.as_str());
        self.cache.insert(lower, resolved.as_str());
        resolved
    }

    fn resolve(&self, entry: &str, lower: &str) -> String {
        let prefix = self.from.canonical_prefix();

        if lower.starts_with(prefix) {
            return self.in_string(entry, 0);
        }

        let hashed = format!("#{}", lower);
        if hashed.starts_with(prefix) {
            let replaced = self.in_string(&format!("#{}", entry), 0);
            return replaced[1..].to_string();
        }

        if lower == self.from_name_lower {
            return self.to.name().to_string();
        }

        let name_prefix_len = self.from_name_lower.len();
        if lower.starts_with(&self.from_name_lower) && lower[name_prefix_len..].starts_with('/') {
            if let Some(suffix) = entry.get(name_prefix_len..) {
                return format!("{}{}", self.to.name(), suffix);
            }
        }

        entry.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacement(from: &str, to: &str) -> Replacement {
        Replacement::new(Tag::new(from), Tag::new(to))
    }

    fn strings(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::String(s.to_string())).collect()
    }

    #[test]
    fn in_string_splices_at_offset() {
        let replace = replacement("foo", "barbaz");
        assert_eq!(replace.in_string("see #foo/x here", 4), "see #barbaz/x here");
        assert_eq!(replace.in_string("#FOO", 0), "#barbaz");
    }

    #[test]
    fn in_string_out_of_range_is_noop() {
        let replace = replacement("foo", "bar");
        assert_eq!(replace.in_string("#fo", 0), "#fo");
        assert_eq!(replace.in_string("é#foo", 1), "é#foo");
    }

    #[test]
    fn replaces_direct_tag_matches() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["#foo", "#nope"]), false, false);
        assert_eq!(out, strings(&["#bar", "#nope"]));
    }

    #[test]
    fn replaces_hierarchical_tag_matches() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["#foo/baz", "#foo/baz/qux", "#foo2"]), false, false);
        assert_eq!(out, strings(&["#bar/baz", "#bar/baz/qux", "#foo2"]));
    }

    #[test]
    fn replaces_bare_names_preserving_suffix_case() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["foo", "FOO", "Foo/Sub", "food"]), false, false);
        assert_eq!(out, strings(&["bar", "bar", "bar/Sub", "food"]));
    }

    #[test]
    fn mixed_case_source_tag_matches_any_case() {
        let mut replace = replacement("Foo", "Bar");
        let out = replace.in_array(&strings(&["#foo", "#FOO/x", "foo"]), false, false);
        assert_eq!(out, strings(&["#Bar", "#Bar/x", "Bar"]));
    }

    #[test]
    fn skips_non_tag_alias_entries() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["#foo", "not-a-tag", "#foo/baz", "foo"]), false, true);
        assert_eq!(out, strings(&["#bar", "not-a-tag", "#bar/baz", "foo"]));
    }

    #[test]
    fn alias_entries_with_punctuation_are_left_alone() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["#foo bar", "#foo."]), false, true);
        assert_eq!(out, strings(&["#foo bar", "#foo."]));
    }

    #[test]
    fn skip_odd_preserves_separators() {
        let mut replace = replacement("🤖", "🧠");
        let out = replace.in_array(&strings(&["hello", ", ", "#🤖", ", ", "world"]), true, true);
        assert_eq!(out, strings(&["hello", ", ", "#🧠", ", ", "world"]));
    }

    #[test]
    fn delimited_entries_are_split_and_rejoined() {
        let mut replace = replacement("foo", "bar");
        let out = replace.in_array(&strings(&["foo, foo/x  other"]), false, false);
        assert_eq!(out, strings(&["bar, bar/x  other"]));
    }

    #[test]
    fn non_string_values_pass_through() {
        let mut replace = replacement("foo", "bar");
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Number(42.into()),
            Value::String("foo".to_string()),
        ];
        let out = replace.in_array(&values, false, false);
        assert_eq!(out[0], Value::Null);
        assert_eq!(out[1], Value::Bool(true));
        assert_eq!(out[2], Value::Number(42.into()));
        assert_eq!(out[3], Value::String("bar".to_string()));
    }

    #[test]
    fn emoji_hierarchies() {
        let mut replace = replacement("🤖", "🧠");
        let out = replace.in_array(&strings(&["#🤖", "#🤖/sub", "#keep"]), false, false);
        assert_eq!(out, strings(&["#🧠", "#🧠/sub", "#keep"]));

        let out = replace.in_array(&strings(&["🤖", "🤖/sub", "keep"]), false, false);
        assert_eq!(out, strings(&["🧠", "🧠/sub", "keep"]));
    }

    #[test]
    fn zwj_emoji_tags() {
        let coder = "👩\u{200D}💻";
        let astronaut = "🧑\u{200D}🚀";
        let from = format!("#{}", coder);
        let from_sub = format!("#{}/dev", coder);
        let to = format!("#{}", astronaut);
        let to_sub = format!("#{}/dev", astronaut);

        let mut replace = replacement(coder, astronaut);
        let out = replace.in_array(&strings(&[from.as_str(), from_sub.as_str(), "#keep"]), false, false);
        assert_eq!(out, strings(&[to.as_str(), to_sub.as_str(), "#keep"]));
    }

    #[test]
    fn flag_emoji_tags() {
        let mut replace = replacement("🇯🇵", "🇺🇸");
        let out = replace.in_array(&strings(&["#🇯🇵", "#🇯🇵/travel", "#keep"]), false, false);
        assert_eq!(out, strings(&["#🇺🇸", "#🇺🇸/travel", "#keep"]));
    }

    #[test]
    fn in_text_list_uses_context_specific_tokenizer() {
        let mut replace = replacement("foo", "bar");
        assert_eq!(
            replace.in_text_list("hello, #foo, world", true),
            "hello, #bar, world"
        );
        assert_eq!(replace.in_text_list("foo foo/x,#foo", false), "bar bar/x,#bar");
        // Alias entries keep interior spaces, so "#foo extra" is not a tag.
        assert_eq!(replace.in_text_list("#foo extra, #foo", true), "#foo extra, #bar");
    }

    #[test]
    fn cache_records_exact_and_lowercase_forms() {
        let mut replace = replacement("foo", "bar");
        let seeded = replace.cache().len();
        replace.in_array(&strings(&["#Foo/Sub"]), false, false);
        assert_eq!(replace.cache().get("#Foo/Sub"), Some("#bar/Sub"));
        assert_eq!(replace.cache().get("#foo/sub"), Some("#bar/Sub"));
        assert_eq!(replace.cache().len(), seeded + 2);

        // Unchanged results are cached too.
        replace.in_array(&strings(&["other"]), false, false);
        assert_eq!(replace.cache().get("other"), Some("other"));
    }

    #[test]
    fn will_merge_detects_direct_clash() {
        let replace = replacement("foo", "bar");
        let clash = replace
            .will_merge_tags(&["#foo", "#bar"])
            .expect("clash expected");
        assert_eq!(clash.origin.tag(), "#foo");
        assert_eq!(clash.clash.tag(), "#bar");
    }

    #[test]
    fn will_merge_detects_sub_tag_clash() {
        let replace = replacement("foo", "bar");
        let clash = replace
            .will_merge_tags(&["#foo", "#foo/x", "#bar/x"])
            .expect("clash expected");
        assert_eq!(clash.origin.tag(), "#foo/x");
        assert_eq!(clash.clash.tag(), "#bar/x");
    }

    #[test]
    fn will_merge_respects_caller_order() {
        let replace = replacement("foo", "bar");
        let names = ["#foo/a", "#foo/b", "#bar/a", "#bar/b"];
        let first = replace.will_merge_tags(&names).map(|c| c.origin.tag().to_string());
        assert_eq!(first.as_deref(), Some("#foo/a"));

        let reversed: Vec<&str> = names.iter().rev().copied().collect();
        let first = replace.will_merge_tags(&reversed).map(|c| c.origin.tag().to_string());
        assert_eq!(first.as_deref(), Some("#foo/b"));
    }

    #[test]
    fn will_merge_ignores_case_only_renames() {
        let replace = replacement("Foo", "FOO");
        assert!(replace.will_merge_tags(&["#Foo", "#FOO", "#foo"]).is_none());
    }

    #[test]
    fn will_merge_without_clash() {
        let replace = replacement("foo", "bar");
        assert!(replace.will_merge_tags(&["#foo", "#foo/x", "#baz"]).is_none());
        assert!(replace.will_merge_tags::<&str>(&[]).is_none());
    }
}

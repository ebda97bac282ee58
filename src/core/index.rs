//! Cached tag index: where each tag occurs, and which documents carry tags
//! or aliases in their front matter.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::config::ClashOrder;
use crate::document::{TagOccurrence, Target};
use crate::error::{Error, Result};
use crate::tag::Tag;
use crate::utils::io;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedFrontMatter {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub path: String,
    #[serde(default)]
    pub tags: Vec<TagOccurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<IndexedFrontMatter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagIndex {
    /// Vault tag vocabulary; derived from `documents` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub documents: Vec<IndexedDocument>,
}

impl TagIndex {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::document_not_found(path.display().to_string())
                .with_hint("Point --index (or the \"index\" config key) at a tag index file"));
        }
        let raw = io::read_file(path, &format!("read tag index {}", path.display()))?;
        Self::from_json(&raw)
            .map_err(|err| err.with_hint(format!("Tag index: {}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::validation_invalid_json(e, Some("parse tag index".to_string())))
    }

    /// Every known tag, hash-prefixed, in index order.
    pub fn all_tags(&self) -> Vec<String> {
        if let Some(tags) = &self.tags {
            return tags.iter().map(|t| Tag::to_tag(t)).collect();
        }

        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for document in &self.documents {
            let body = document.tags.iter().map(|o| Tag::to_tag(&o.tag));
            let front = document
                .frontmatter
                .iter()
                .flat_map(|fm| fm.tags.iter().map(|t| Tag::to_tag(t)));
            for tag in body.chain(front) {
                if seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }
        }
        tags
    }

    /// Tags to check for a merge clash, in the order they should be checked.
    pub fn clash_candidates(&self, order: ClashOrder) -> Vec<String> {
        let mut tags = self.all_tags();
        if order == ClashOrder::LongestFirst {
            tags.reverse();
        }
        tags
    }

    /// Documents that mention `tag` or one of its sub-tags in the body or
    /// front matter.
    pub fn find_targets(&self, tag: &Tag) -> Vec<Target> {
        self.documents
            .iter()
            .filter_map(|document| {
                let mut occurrences: Vec<TagOccurrence> = document
                    .tags
                    .iter()
                    .filter(|o| tag.matches(&o.tag))
                    .cloned()
                    .collect();
                occurrences.sort_by(|a, b| b.start.cmp(&a.start));

                let front_matter_count = document.frontmatter.as_ref().map_or(0, |fm| {
                    let tags = fm.tags.iter().filter(|t| tag.matches(&Tag::to_tag(t))).count();
                    let aliases = fm
                        .aliases
                        .iter()
                        .filter(|a| Tag::is_tag(a) && tag.matches(a))
                        .count();
                    tags + aliases
                });

                (!occurrences.is_empty() || front_matter_count > 0).then(|| Target {
                    path: document.path.clone(),
                    occurrences,
                    has_front_matter: front_matter_count > 0,
                })
            })
            .collect()
    }
}

//! Rename a tag inside one document: body occurrences first, then front matter.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStaleDetails, Error, Result};
use crate::frontmatter;
use crate::replacement::Replacement;

/// A tag found in a document body at byte offsets `start..end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOccurrence {
    pub tag: String,
    pub start: usize,
    pub end: usize,
}

/// A document the rename has to visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub path: String,
    /// Matching body occurrences, last position first.
    pub occurrences: Vec<TagOccurrence>,
    pub has_front_matter: bool,
}

impl Target {
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentRewrite {
    pub text: String,
    pub changed: bool,
    /// Front matter could not be rewritten; body edits are still in `text`.
    pub front_matter_error: Option<Error>,
}

/// Apply `replace` to `original`, the current contents of `target`.
///
/// Occurrences are applied in the order given, so they must run from the
/// end of the text towards the start. If any occurrence no longer matches
/// the text the whole document is rejected as stale.
pub fn rename_document(
    target: &Target,
    original: &str,
    replace: &mut Replacement,
) -> Result<DocumentRewrite> {
    let mut text = original.to_string();

    for occurrence in &target.occurrences {
        let found = text.get(occurrence.start..occurrence.end);
        if found != Some(occurrence.tag.as_str()) {
            return Err(Error::document_stale(DocumentStaleDetails {
                path: target.path.clone(),
                start: occurrence.start,
                end: occurrence.end,
                expected: occurrence.tag.clone(),
                found: found.map(str::to_string),
            }));
        }
        text = replace.in_string(&text, occurrence.start);
    }

    let mut front_matter_error = None;
    if target.has_front_matter {
        match frontmatter::replace_front_matter_text(&text, replace) {
            Ok(updated) => text = updated,
            Err(err) => front_matter_error = Some(err),
        }
    }

    let changed = text != original;
    Ok(DocumentRewrite {
        text,
        changed,
        front_matter_error,
    })
}

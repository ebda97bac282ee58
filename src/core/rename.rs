//! Plan and apply a tag rename across a vault.
//!
//! Planning validates the request, finds the documents to visit and checks
//! for a merge clash without touching anything. Applying a plan runs the
//! batch driver against a document store.

use serde::Serialize;

use crate::batch::{self, BatchOptions, CancelFlag, DocumentStore};
use crate::config::ClashOrder;
use crate::document::Target;
use crate::error::{Error, Result};
use crate::index::TagIndex;
use crate::output::RenameReport;
use crate::replacement::{Clash, ClashSummary, Replacement};
use crate::tag::Tag;

/// A validated rename, ready to apply.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub replacement: Replacement,
    pub clash: Option<Clash>,
    pub targets: Vec<Target>,
}

/// Serializable overview of a plan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clash: Option<ClashSummary>,
    pub documents: usize,
    pub occurrences: usize,
    pub front_matter_documents: usize,
}

/// Check that `from -> to` is a meaningful rename to a valid tag name.
pub fn validate_names(from: &str, to: &str) -> Result<(Tag, Tag)> {
    let unchanged = |field: &str| {
        Error::validation_invalid_argument(
            field,
            "Unchanged or empty tag: no changes made",
            None,
            None,
        )
    };

    let from = from.trim();
    let to = to.trim();
    if from.is_empty() || from.chars().all(|c| c == '#') {
        return Err(unchanged("from"));
    }
    if to.is_empty() || to.chars().all(|c| c == '#') || Tag::to_tag(from) == Tag::to_tag(to) {
        return Err(unchanged("to"));
    }
    if !Tag::is_tag(to) {
        return Err(Error::tag_invalid_name(to));
    }

    Ok((Tag::new(from), Tag::new(to)))
}

/// Validate the request and work out what a rename would do.
pub fn plan(index: &TagIndex, from: &str, to: &str, order: ClashOrder) -> Result<RenamePlan> {
    let (from, to) = validate_names(from, to)?;
    let targets = index.find_targets(&from);
    let replacement = Replacement::new(from, to);
    let clash = replacement.will_merge_tags(&index.clash_candidates(order));

    Ok(RenamePlan {
        replacement,
        clash,
        targets,
    })
}

impl RenamePlan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            from: self.replacement.from_tag().tag().to_string(),
            to: self.replacement.to_tag().tag().to_string(),
            clash: self.clash.as_ref().map(ClashSummary::from),
            documents: self.targets.len(),
            occurrences: self.targets.iter().map(|t| t.occurrences.len()).sum(),
            front_matter_documents: self.targets.iter().filter(|t| t.has_front_matter).count(),
        }
    }

    /// The clash as an error, for callers that refuse to merge.
    pub fn clash_error(&self) -> Option<Error> {
        self.clash.as_ref().map(|clash| {
            Error::tag_merge_clash(
                self.replacement.from_tag().tag(),
                self.replacement.to_tag().tag(),
                clash.origin.tag(),
                clash.clash.tag(),
            )
        })
    }

    pub fn apply(
        &mut self,
        store: &dyn DocumentStore,
        cancel: &CancelFlag,
        options: BatchOptions,
    ) -> RenameReport {
        batch::rename_targets(&self.targets, &mut self.replacement, store, cancel, options)
    }
}

//! Public output types for rename results.

use serde::{Deserialize, Serialize};

// ============================================================================
// Rename Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Updated,
    Unchanged,
    Skipped,
    Error,
}

/// Summary of a batch rename over many documents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenameReport {
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub errors: u32,
    pub cancelled: bool,
    pub dry_run: bool,
    pub items: Vec<RenameReportItem>,
}

/// Outcome for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReportItem {
    pub path: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RenameReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, path: String, status: DocumentStatus, error: Option<String>, warning: Option<String>) {
        self.items.push(RenameReportItem {
            path,
            status,
            error,
            warning,
        });
    }

    pub fn record_updated(&mut self, path: String, warning: Option<String>) {
        self.updated += 1;
        self.push(path, DocumentStatus::Updated, None, warning);
    }

    pub fn record_unchanged(&mut self, path: String, warning: Option<String>) {
        self.unchanged += 1;
        self.push(path, DocumentStatus::Unchanged, None, warning);
    }

    pub fn record_skipped(&mut self, path: String, reason: String) {
        self.skipped += 1;
        self.push(path, DocumentStatus::Skipped, Some(reason), None);
    }

    pub fn record_error(&mut self, path: String, error: String) {
        self.errors += 1;
        self.push(path, DocumentStatus::Error, Some(error), None);
    }

    /// Documents the batch looked at, whatever the outcome.
    pub fn processed(&self) -> usize {
        self.items.len()
    }
}

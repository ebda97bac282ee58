//! Drive a rename across many documents, one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::document::{rename_document, Target};
use crate::error::{ErrorCode, Result};
use crate::output::RenameReport;
use crate::replacement::Replacement;

/// Where documents are read from and written back to.
pub trait DocumentStore {
    fn read(&self, path: &str) -> Result<String>;
    fn write(&self, path: &str, text: &str) -> Result<()>;
}

/// Cooperative cancellation, checked once before each document.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whole-percent progress over a known number of steps, without floating
/// point. `advance` returns the new percentage only when it moves.
#[derive(Debug, Clone)]
pub struct Progress {
    total: usize,
    processed: usize,
    accumulator: usize,
    percent: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Progress {
            total,
            processed: 0,
            accumulator: 0,
            percent: 0,
        }
    }

    pub fn percent(&self) -> usize {
        self.percent
    }

    pub fn advance(&mut self) -> Option<usize> {
        if self.processed >= self.total {
            return None;
        }
        self.processed += 1;
        self.accumulator += 100;

        let before = self.percent;
        while self.accumulator >= self.total {
            self.accumulator -= self.total;
            self.percent += 1;
        }

        (self.percent != before).then_some(self.percent)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Compute every rewrite but never write back.
    pub dry_run: bool,
}

/// Rename across `targets`, continuing past per-document failures.
///
/// Stale documents are skipped, unreadable or unwritable ones are recorded
/// as errors, and a front-matter failure becomes a warning on a document
/// whose body edits are still written.
pub fn rename_targets(
    targets: &[Target],
    replace: &mut Replacement,
    store: &dyn DocumentStore,
    cancel: &CancelFlag,
    options: BatchOptions,
) -> RenameReport {
    let mut report = RenameReport::new();
    report.dry_run = options.dry_run;
    let mut progress = Progress::new(targets.len());

    log_status!(
        "rename",
        "Renaming {} to {} in {} document(s)",
        replace.from_tag(),
        replace.to_tag(),
        targets.len()
    );

    for target in targets {
        if cancel.is_cancelled() {
            log_status!("rename", "Cancelled after {} document(s)", report.processed());
            report.cancelled = true;
            break;
        }

        log_status!("rename", "Processing {}", target.basename());
        process_target(target, replace, store, options, &mut report);

        if let Some(percent) = progress.advance() {
            log_status!("rename", "{}% complete", percent);
        }
    }

    report
}

fn process_target(
    target: &Target,
    replace: &mut Replacement,
    store: &dyn DocumentStore,
    options: BatchOptions,
    report: &mut RenameReport,
) {
    let path = target.path.clone();

    let rewrite = match store
        .read(&target.path)
        .and_then(|original| rename_document(target, &original, replace))
    {
        Ok(rewrite) => rewrite,
        Err(err) if err.code == ErrorCode::DocumentStale => {
            log_status!("rename", "File has changed; skipping: {}", target.path);
            report.record_skipped(path, err.summary());
            return;
        }
        Err(err) => {
            log_status!("rename", "Failed to process {}: {}", target.path, err.summary());
            report.record_error(path, err.summary());
            return;
        }
    };

    let warning = rewrite.front_matter_error.as_ref().map(|err| {
        log_status!(
            "rename",
            "YAML issue with {}; front matter left unchanged: {}",
            target.path,
            err.summary()
        );
        err.summary()
    });

    if !rewrite.changed {
        report.record_unchanged(path, warning);
        return;
    }

    if options.dry_run {
        report.record_updated(path, warning);
        return;
    }

    match store.write(&target.path, &rewrite.text) {
        Ok(()) => report.record_updated(path, warning),
        Err(err) => report.record_error(path, err.summary()),
    }
}

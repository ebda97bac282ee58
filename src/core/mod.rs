// Public modules
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod output;
pub mod rename;
pub mod replacement;
pub mod tag;
pub mod tokens;
pub mod vault;

// Re-export common types for convenience
pub use batch::{BatchOptions, CancelFlag, DocumentStore};
pub use config::{ClashOrder, RetagConfig};
pub use document::{TagOccurrence, Target};
pub use error::{Error, ErrorCode, Result};
pub use index::TagIndex;
pub use output::{DocumentStatus, RenameReport, RenameReportItem};
pub use rename::{PlanSummary, RenamePlan};
pub use replacement::{Clash, ClashSummary, Replacement};
pub use tag::Tag;
pub use vault::VaultStore;

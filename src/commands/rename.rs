use clap::Args;
use serde::Serialize;

use retag::rename::{self, PlanSummary};
use retag::{BatchOptions, CancelFlag, RenameReport, VaultStore};

use super::{CmdResult, GlobalArgs, VaultArgs};

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Tag to rename (with or without the leading '#')
    pub from: String,

    /// New tag name
    pub to: String,

    #[command(flatten)]
    pub vault: VaultArgs,

    /// Compute every change without writing any document
    #[arg(long)]
    pub dry_run: bool,

    /// Merge into an existing tag without asking
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RenameOutput {
    #[serde(rename = "rename")]
    Rename {
        plan: PlanSummary,
        merged: bool,
        report: RenameReport,
    },
}

pub fn run(args: RenameArgs, _global: &GlobalArgs) -> CmdResult<RenameOutput> {
    let vault = args.vault.open()?;
    let mut plan = rename::plan(&vault.index, &args.from, &args.to, vault.config.clash_order)?;

    if let Some(err) = plan.clash_error() {
        if !args.force && !confirm_merge(&err)? {
            return Err(err);
        }
        retag::log_status!("rename", "{}; merging", err.message);
    }

    let store = VaultStore::new(&vault.root).with_atomic_writes(vault.config.atomic_writes);
    let report = plan.apply(
        &store,
        &CancelFlag::new(),
        BatchOptions {
            dry_run: args.dry_run,
        },
    );

    let exit_code = if report.errors > 0 { 1 } else { 0 };

    Ok((
        RenameOutput::Rename {
            plan: plan.summary(),
            merged: plan.clash.is_some(),
            report,
        },
        exit_code,
    ))
}

/// Ask before merging, but only when someone can answer.
fn confirm_merge(err: &retag::Error) -> retag::Result<bool> {
    if !crate::tty::require_tty_for_interactive() {
        return Ok(false);
    }
    crate::tty::confirm(&format!(
        "{}. Tags will be merged and this cannot be undone. Continue? [y/N] ",
        err.message
    ))
}

use clap::Args;
use serde::Serialize;

use retag::rename::{self, PlanSummary};

use super::{CmdResult, GlobalArgs, VaultArgs};

/// Exit code when the rename would merge two existing tags.
const CLASH_EXIT_CODE: i32 = 3;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Tag to rename (with or without the leading '#')
    pub from: String,

    /// New tag name
    pub to: String,

    #[command(flatten)]
    pub vault: VaultArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum CheckOutput {
    #[serde(rename = "check")]
    Check {
        plan: PlanSummary,
        #[serde(rename = "wouldMerge")]
        would_merge: bool,
    },
}

pub fn run(args: CheckArgs, _global: &GlobalArgs) -> CmdResult<CheckOutput> {
    let vault = args.vault.open()?;
    let plan = rename::plan(&vault.index, &args.from, &args.to, vault.config.clash_order)?;

    let would_merge = plan.clash.is_some();
    let exit_code = if would_merge { CLASH_EXIT_CODE } else { 0 };

    Ok((
        CheckOutput::Check {
            plan: plan.summary(),
            would_merge,
        },
        exit_code,
    ))
}

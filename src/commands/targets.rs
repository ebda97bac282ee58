use clap::Args;
use serde::Serialize;

use retag::{Error, Tag, Target};

use super::{CmdResult, GlobalArgs, VaultArgs};

#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Tag to look up; sub-tags are included
    pub tag: String,

    #[command(flatten)]
    pub vault: VaultArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum TargetsOutput {
    #[serde(rename = "targets")]
    Targets {
        tag: String,
        total: usize,
        documents: Vec<Target>,
    },
}

pub fn run(args: TargetsArgs, _global: &GlobalArgs) -> CmdResult<TargetsOutput> {
    if args.tag.trim().trim_start_matches('#').is_empty() {
        return Err(Error::validation_missing_argument(vec!["tag".to_string()]));
    }

    let vault = args.vault.open()?;
    let tag = Tag::new(args.tag.trim());
    let documents = vault.index.find_targets(&tag);

    Ok((
        TargetsOutput::Targets {
            tag: tag.tag().to_string(),
            total: documents.len(),
            documents,
        },
        0,
    ))
}

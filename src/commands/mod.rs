use clap::Args;
use retag::config::expand_path;
use retag::log_status;
use retag::{Error, RetagConfig, TagIndex};
use std::path::PathBuf;

pub type CmdResult<T> = retag::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Where the vault, its config and its tag index live.
#[derive(Args, Debug, Clone)]
pub struct VaultArgs {
    /// Vault root directory
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Tag index file (overrides the config's "index")
    #[arg(long, value_name = "FILE")]
    pub index: Option<String>,

    /// Config file (default: <root>/.retag.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,
}

pub(crate) struct Vault {
    pub root: PathBuf,
    pub config: RetagConfig,
    pub index: TagIndex,
}

impl VaultArgs {
    pub(crate) fn open(&self) -> retag::Result<Vault> {
        let root = expand_path(&self.root);
        if !root.is_dir() {
            return Err(Error::validation_invalid_argument(
                "root",
                "Vault root is not a directory",
                Some(self.root.clone()),
                None,
            ));
        }

        let config_path = self.config.as_deref().map(expand_path);
        let config = RetagConfig::load(&root, config_path.as_deref())?;

        let index_path = match &self.index {
            Some(path) => expand_path(path),
            None => config.index_path(&root),
        };
        log_status!("vault", "Loading tag index {}", index_path.display());
        let index = TagIndex::load(&index_path)?;

        Ok(Vault {
            root,
            config,
            index,
        })
    }
}

pub mod check;
pub mod rename;
pub mod targets;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (retag::Result<serde_json::Value>, i32) {
    crate::tty::status("retag is working...");

    match command {
        crate::Commands::Rename(args) => dispatch!(args, global, rename),
        crate::Commands::Check(args) => dispatch!(args, global, check),
        crate::Commands::Targets(args) => dispatch!(args, global, targets),
    }
}

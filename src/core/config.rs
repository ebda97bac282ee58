use crate::error::{Error, Result};
use crate::utils::io;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-vault configuration file, looked up at the vault root.
pub const CONFIG_FILE: &str = ".retag.json";

/// Default tag index location, relative to the vault root.
pub const DEFAULT_INDEX: &str = ".retag/index.json";

/// Order in which existing tags are checked for a merge clash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClashOrder {
    /// Index vocabulary reversed, so the last-listed tag is reported first.
    #[default]
    LongestFirst,
    IndexOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetagConfig {
    pub index: String,
    pub atomic_writes: bool,
    pub clash_order: ClashOrder,
}

impl Default for RetagConfig {
    fn default() -> Self {
        RetagConfig {
            index: DEFAULT_INDEX.to_string(),
            atomic_writes: true,
            clash_order: ClashOrder::default(),
        }
    }
}

impl RetagConfig {
    /// Load `explicit` if given, else `<root>/.retag.json` if it exists,
    /// else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(&expand_path(&path.to_string_lossy())),
            None => {
                let path = root.join(CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = io::read_file(path, &format!("read config {}", path.display()))?;
        let config: RetagConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "index",
                Some(self.index.clone()),
                "Index path cannot be empty",
            ));
        }
        Ok(())
    }

    /// Index file location; relative paths resolve against `root`.
    pub fn index_path(&self, root: &Path) -> PathBuf {
        let path = expand_path(&self.index);
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}

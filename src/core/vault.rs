//! Document store over a directory of Markdown files.

use std::path::{Component, Path, PathBuf};

use crate::batch::DocumentStore;
use crate::error::{Error, Result};
use crate::utils::io;

#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
    atomic_writes: bool,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        VaultStore {
            root: root.into(),
            atomic_writes: true,
        }
    }

    pub fn with_atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a vault-relative document path.
    ///
    /// Absolute paths and `..` components are refused so a document path can
    /// never point outside the vault.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let contained = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !contained {
            return Err(Error::validation_invalid_argument(
                "path",
                "Document path must stay inside the vault",
                Some(path.to_string()),
                None,
            ));
        }

        Ok(self.root.join(relative))
    }

    fn existing(&self, path: &str) -> Result<PathBuf> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(Error::document_not_found(path));
        }
        Ok(full)
    }
}

impl DocumentStore for VaultStore {
    fn read(&self, path: &str) -> Result<String> {
        let full = self.existing(path)?;
        io::read_file(&full, &format!("read {}", path))
    }

    fn write(&self, path: &str, text: &str) -> Result<()> {
        let full = self.existing(path)?;
        let operation = format!("write {}", path);
        if self.atomic_writes {
            io::write_file_atomic(&full, text, &operation)
        } else {
            io::write_file(&full, text, &operation)
        }
    }
}

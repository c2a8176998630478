//! Script sources.
//!
//! `run` resolves script names through a [`ScriptStore`]. The kernel never
//! touches the filesystem directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid script name: {0}")]
    InvalidName(String),
    #[error("failed to read script {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maps script names to their raw text.
pub trait ScriptStore: Send + Sync {
    /// Load a script, or `None` if no script has that name.
    fn load(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Known script names, sorted.
    fn names(&self) -> Result<Vec<String>, StoreError>;
}

/// Scripts held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scripts: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryStore::insert`].
    pub fn with(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) {
        self.scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), text.into());
    }
}

impl ScriptStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}

/// Scripts stored as `<name>.<extension>` files in one directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    extension: String,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let invalid = name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == "..";
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", name, self.extension)))
    }
}

impl ScriptStore for DirStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Io {
                name: name.to_string(),
                source,
            })
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            name: self.root.display().to_string(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let matches = path
                .extension()
                .map(|ext| ext == self.extension.as_str())
                .unwrap_or(false);
            if !matches || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

//! Small JSON file persistence helper.
//!
//! Used for state that has to survive restarts, such as the set of viewers a
//! stream has already greeted.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error types for JSON file persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error when reading or writing the file
    #[error("File I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold the expected JSON
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON document stored in a single file, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. `Ok(None)` when the file does not exist.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Pretty-print the document to disk, creating the parent directory if needed.
    pub fn save<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        fs::write(&self.path, content).map_err(io_err)
    }

    /// Load a JSON array of strings as a set. Missing or corrupt files yield an empty set.
    pub fn load_set(&self) -> BTreeSet<String> {
        match self.load::<Vec<String>>() {
            Ok(Some(items)) => items.into_iter().collect(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!("⚠️ Could not load {}: {}", self.path.display(), e);
                BTreeSet::new()
            }
        }
    }

    /// Save a set as a sorted JSON array.
    pub fn save_set(&self, data: &BTreeSet<String>) -> Result<(), StoreError> {
        let sorted: Vec<&String> = data.iter().collect();
        self.save(&sorted)
    }
}

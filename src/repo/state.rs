//! Persistent HTTP validators for conditional requests.
//!
//! Each cached file (and each in-progress `.partial` file) may have an ETag
//! and Last-Modified recorded from the response that produced it. The store
//! lives at the cache root, outside every bucket, so reconciliation sweeps
//! never touch it.

use crate::error::{ErrorExt, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Validators returned by the server for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Validators keyed by local file path.
#[derive(Debug, Default)]
pub struct ValidatorStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Validators>,
}

impl ValidatorStore {
    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`. A missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring corrupt fetch state {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    pub fn get(&self, file: &Path) -> Option<&Validators> {
        self.entries.get(&key(file))
    }

    /// Record validators for `file` and persist. Empty validators clear the entry.
    pub fn set(&mut self, file: &Path, validators: Validators) -> Result<()> {
        if validators.is_empty() {
            self.entries.remove(&key(file));
        } else {
            self.entries.insert(key(file), validators);
        }
        self.save()
    }

    pub fn remove(&mut self, file: &Path) -> Result<()> {
        if self.entries.remove(&key(file)).is_some() {
            self.save()?;
        }
        Ok(())
    }

    /// Write to a temp file, then rename over the target.
    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let serialized = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&temp_path, serialized).fs_context("writing fetch state", &temp_path)?;
        std::fs::rename(&temp_path, path).fs_context("replacing fetch state", path)
    }
}

fn key(file: &Path) -> String {
    file.to_string_lossy().into_owned()
}

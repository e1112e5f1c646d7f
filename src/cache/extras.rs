//! Additions and exceptions supplied through the extras JSON file.
//!
//! ```json
//! {
//!   "additions_list": ["/Library/Packages/local.pkg", "https://example.com/remote.pkg"],
//!   "exceptions_list": ["Microsoft_Office_2016_Installer.pkg"]
//! }
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Contents of the extras file. Both lists are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    /// Local package paths or URLs merged into the package list
    #[serde(default)]
    pub additions_list: Vec<String>,
    /// Package file names redirected to the exceptions bucket
    #[serde(default)]
    pub exceptions_list: Vec<String>,
}

impl Extras {
    /// Parse the extras file. Any failure is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |reason: String| ConfigError::InvalidExtras {
            path: path.to_path_buf(),
            reason,
        };
        log::info!("Parsing extras file {}...", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let extras: Self = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

        if !extras.exceptions_list.is_empty() {
            log::info!("Found {} exceptions.", extras.exceptions_list.len());
        }
        if !extras.additions_list.is_empty() {
            log::info!("Found {} additional packages.", extras.additions_list.len());
        }
        Ok(extras)
    }

    pub fn exceptions(&self) -> HashSet<String> {
        self.exceptions_list.iter().cloned().collect()
    }
}

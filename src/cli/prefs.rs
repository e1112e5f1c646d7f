//! Munki client preferences.
//!
//! The repository URL and extra HTTP headers fall back to the values the
//! Munki client itself uses, read from `ManagedInstalls.plist`.

use serde::Deserialize;
use std::path::Path;

/// Default location of the Munki client preferences
pub const DEFAULT_PREFS_PATH: &str = "/Library/Preferences/ManagedInstalls.plist";

/// The subset of Munki preferences this tool reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MunkiPrefs {
    #[serde(rename = "SoftwareRepoURL", default)]
    pub software_repo_url: Option<String>,
    #[serde(rename = "AdditionalHttpHeaders", default)]
    pub additional_http_headers: Vec<String>,
}

impl MunkiPrefs {
    /// Read preferences from `path`.
    ///
    /// A missing or unreadable file yields empty preferences; the caller
    /// reports what is still missing.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            log::debug!("No Munki preferences at {}", path.display());
            return Self::default();
        }
        match plist::from_file(path) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("Ignoring unreadable Munki preferences {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

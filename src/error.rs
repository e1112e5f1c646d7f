//! Error types for cache building operations.
//!
//! This module defines the error taxonomy shared by every step of a run and
//! maps each class of failure onto the process exit status.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for cache building operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all cache building operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid flag combination or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors without a more specific context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem operation failed on a known path
    #[error("Failed {action} at {}: {source}", path.display())]
    Fs {
        /// What was being attempted
        action: String,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered but the resource could not be retrieved
    #[error("Download of {url} failed: {reason}")]
    Fetch {
        /// Requested URL
        url: String,
        /// Reason for the failure
        reason: String,
    },

    /// Property list parsing or serialization errors
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A manifest could not be fetched and no cached copy exists
    #[error("Manifest {name} unavailable: {reason}")]
    ManifestUnavailable {
        /// Manifest name
        name: String,
        /// Reason for the error
        reason: String,
    },

    /// A catalog could not be fetched and no cached copy exists
    #[error("Catalog {name} unavailable: {reason}")]
    CatalogUnavailable {
        /// Catalog name
        name: String,
        /// Reason for the error
        reason: String,
    },

    /// External packaging or imaging tool failed
    #[error("Command execution failed: {command} - {reason}")]
    Tool {
        /// Command that failed
        command: String,
        /// Reason for the error, usually the tool's stderr
        reason: String,
    },

    /// Anything else
    #[error("{0}")]
    GenericError(String),
}

/// Configuration errors, detected before any network activity
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No repository URL on the command line, environment, or Munki prefs
    #[error("No Munki repository URL configured (use --munkirepo or set SoftwareRepoURL)")]
    MissingRepository,

    /// Invalid repository URL
    #[error("Invalid repository URL {url}: {reason}")]
    InvalidRepository {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// HTTPS repository but no authentication headers
    #[error("HTTPS was used but no auth provided")]
    HttpsWithoutAuth,

    /// Header not of the form `Name: value`
    #[error("Invalid HTTP header {header:?}: {reason}")]
    InvalidHeader {
        /// Offending header line
        header: String,
        /// Reason for the error
        reason: String,
    },

    /// Command line arguments that clap accepts but that make no sense together
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    /// Extras file unreadable or malformed
    #[error("Invalid extras file {}: {reason}", path.display())]
    InvalidExtras {
        /// Extras file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl Error {
    /// Process exit status for this error.
    ///
    /// Configuration errors exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            _ => 1,
        }
    }

    /// Whether the error came from the network rather than local state
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Fetch { .. })
    }
}

/// Attaches filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Wrap the error with the attempted action and the path it touched.
    fn fs_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Fs {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

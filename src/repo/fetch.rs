//! Remote fetcher interface.
//!
//! A fetcher downloads a URL into a cache directory only when the remote
//! content changed, writing atomically. Everything above this module only
//! cares about the outcome: where the file is and whether it changed.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Suffix of an in-progress download, kept next to its destination.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// One download request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Resource URL
    pub url: &'a str,
    /// Directory receiving the file, named after the decoded URL basename
    pub dest_dir: &'a Path,
    /// Expected SHA-256 hex digest of the content
    pub expected_hash: Option<&'a str>,
    /// Ignore local copies and validators and download again
    pub force: bool,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str, dest_dir: &'a Path) -> Self {
        Self {
            url,
            dest_dir,
            expected_hash: None,
            force: false,
        }
    }

    pub fn expected_hash(mut self, hash: Option<&'a str>) -> Self {
        self.expected_hash = hash;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Final path of the cached file
    pub path: PathBuf,
    /// Whether new content was written
    pub changed: bool,
}

impl FetchOutcome {
    /// File name of the cached file
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Downloads resources into the local cache.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Fetch `request.url` into `request.dest_dir` if it changed.
    async fn fetch(&mut self, request: FetchRequest<'_>) -> Result<FetchOutcome>;

    /// Drop any state kept for a cached file that no longer exists.
    fn forget(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

//! On-disk layout of the local cache.

use crate::error::{ErrorExt, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Cache subdirectory holding artifacts of one kind.
///
/// Reconciliation mirrors each bucket to the files the current run requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Ordinary package downloads, installed through the template
    Downloads,
    /// Packages redirected by the exceptions list, shipped inside `munki_cache.pkg`
    Exceptions,
    /// Icons of optional installs, shipped inside `munki_icons.pkg`
    Icons,
    /// Remote entries of the additions list
    Additions,
}

impl Bucket {
    /// Directory name under the cache root
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Downloads => "downloads",
            Bucket::Exceptions => "exceptions",
            Bucket::Icons => "icons",
            Bucket::Additions => "additions",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Paths of everything the tool keeps under its cache root.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub const ICONS_PKG: &'static str = "munki_icons.pkg";
    pub const EXCEPTIONS_PKG: &'static str = "munki_cache.pkg";
    pub const SUPPRESS_REGISTRATION_PKG: &'static str = "suppress_registration.pkg";
    pub const TEMPLATE: &'static str = "AutoDMG-full.adtmpl";
    pub const FETCH_STATE: &'static str = "fetch_state.json";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn catalogs_dir(&self) -> PathBuf {
        self.root.join("catalogs")
    }

    pub fn bucket(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    pub fn icons_pkg(&self) -> PathBuf {
        self.root.join(Self::ICONS_PKG)
    }

    pub fn exceptions_pkg(&self) -> PathBuf {
        self.root.join(Self::EXCEPTIONS_PKG)
    }

    pub fn suppress_registration_pkg(&self) -> PathBuf {
        self.root.join(Self::SUPPRESS_REGISTRATION_PKG)
    }

    pub fn template(&self) -> PathBuf {
        self.root.join(Self::TEMPLATE)
    }

    pub fn fetch_state(&self) -> PathBuf {
        self.root.join(Self::FETCH_STATE)
    }

    /// Output image path. An absolute `output` is used as-is.
    pub fn image(&self, output: &Path) -> PathBuf {
        self.root.join(output)
    }

    /// Create every cache directory. Already existing directories are fine.
    pub async fn create_all(&self) -> Result<()> {
        let dirs = [
            self.manifests_dir(),
            self.catalogs_dir(),
            self.bucket(Bucket::Downloads),
            self.bucket(Bucket::Exceptions),
            self.bucket(Bucket::Icons),
            self.bucket(Bucket::Additions),
        ];
        for dir in dirs {
            tokio::fs::create_dir_all(&dir)
                .await
                .fs_context("creating cache directory", &dir)?;
        }
        log::debug!("Cache layout ready at {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_every_directory() {
        let temp = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(temp.path().join("cache"));
        layout.create_all().await.unwrap();
        // second call is a no-op
        layout.create_all().await.unwrap();

        for name in ["manifests", "catalogs", "downloads", "exceptions", "icons", "additions"] {
            assert!(temp.path().join("cache").join(name).is_dir(), "{name} missing");
        }
    }

    #[test]
    fn absolute_output_wins() {
        let layout = CacheLayout::new("/Library/AutoDMG");
        assert_eq!(
            layout.image(Path::new("out.dmg")),
            PathBuf::from("/Library/AutoDMG/out.dmg")
        );
        assert_eq!(
            layout.image(Path::new("/Volumes/x/out.dmg")),
            PathBuf::from("/Volumes/x/out.dmg")
        );
    }
}

//! Settings for one cache build run.

use crate::cache::{Extras, SweepPolicy};
use std::path::PathBuf;

/// Everything a [`CacheBuilder`](super::CacheBuilder) needs besides its
/// collaborators. Built from the command line by the CLI layer.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub manifest: String,
    /// Catalog names in lookup order
    pub catalogs: Vec<String>,
    /// Image file name, joined to the cache root
    pub output: PathBuf,
    /// OS installer the image is built from
    pub source: PathBuf,
    pub volume_name: String,
    pub log_path: PathBuf,
    pub log_level: u8,
    /// Download every artifact again
    pub force_download: bool,
    /// Build the image even when nothing changed
    pub force_build: bool,
    pub no_icons: bool,
    /// Refresh AutoDMG's update profiles before building
    pub update_profiles: bool,
    pub dsrepo: Option<PathBuf>,
    pub sweep_policy: SweepPolicy,
    pub extras: Extras,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            manifest: "prod".to_string(),
            catalogs: vec!["prod".to_string()],
            output: PathBuf::from("AutoDMG_full.hfs.dmg"),
            source: PathBuf::from("/Applications/Install OS X Yosemite.app"),
            volume_name: "Macintosh HD".to_string(),
            log_path: PathBuf::from("/Users/Shared/AutoDMG_build.log"),
            log_level: 6,
            force_download: false,
            force_build: false,
            no_icons: false,
            update_profiles: false,
            dsrepo: None,
            sweep_policy: SweepPolicy::default(),
            extras: Extras::default(),
        }
    }
}

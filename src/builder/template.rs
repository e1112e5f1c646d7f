//! AutoDMG template generation.

use crate::error::Result;
use crate::utils::fs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Template format understood by AutoDMG
pub const TEMPLATE_FORMAT: &str = "1.0";

/// AutoDMG build template, serialized as an XML property list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub apply_updates: bool,
    pub source_path: String,
    pub template_format: String,
    pub volume_name: String,
    pub additional_packages: Vec<String>,
}

impl Template {
    pub fn new(source_path: &Path, volume_name: &str, additional_packages: Vec<String>) -> Self {
        Self {
            apply_updates: true,
            source_path: source_path.display().to_string(),
            template_format: TEMPLATE_FORMAT.to_string(),
            volume_name: volume_name.to_string(),
            additional_packages,
        }
    }

    /// Write the template to `path`, replacing any previous one.
    pub fn write(&self, path: &Path) -> Result<()> {
        plist::to_file_xml(path, self)?;
        log::info!("✓ Wrote template: {}", path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        Ok(plist::from_file(path)?)
    }
}

/// Assemble the package list: the downloads bucket by file name, then
/// `additions` in order.
///
/// `.DS_Store` and names in `exceptions` are left out of the downloads part.
pub async fn collect_packages(
    downloads_dir: &Path,
    exceptions: &HashSet<String>,
    additions: &[PathBuf],
) -> Result<Vec<String>> {
    let mut packages: Vec<String> = fs::list_files(downloads_dir)
        .await?
        .into_iter()
        .filter(|name| name != ".DS_Store" && !exceptions.contains(name))
        .map(|name| downloads_dir.join(name).display().to_string())
        .collect();
    packages.extend(additions.iter().map(|p| p.display().to_string()));
    Ok(packages)
}

//! Publishing finished images to a DeployStudio repository.

use crate::error::{Error, ErrorExt, Result};
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// Directory of HFS masters inside a DeployStudio repository
pub const MASTERS_DIR: &str = "Masters/HFS";

/// Copy `image` into `<dsrepo>/Masters/HFS`.
///
/// An image of the same name already there is renamed with an `-OLD`
/// suffix first, replacing any earlier `-OLD` copy. Returns the published path.
pub async fn publish_to_deploystudio(image: &Path, dsrepo: &Path) -> Result<PathBuf> {
    let name = image
        .file_name()
        .ok_or_else(|| Error::GenericError(format!("{} has no file name", image.display())))?;
    let masters = dsrepo.join(MASTERS_DIR);
    let target = masters.join(name);

    if target.is_file() {
        let mut old_name = name.to_os_string();
        old_name.push("-OLD");
        let old = masters.join(old_name);
        log::info!("Renaming existing master to {}", old.display());
        tokio::fs::rename(&target, &old)
            .await
            .fs_context("renaming previous master", &target)?;
    }

    log::info!("Copying new image to DS Repo.");
    fs::create_dir_all(&masters).await?;
    tokio::fs::copy(image, &target)
        .await
        .fs_context("copying image to DeployStudio repository", &target)?;
    log::info!("✓ Published {}", target.display());
    Ok(target)
}

//! File system utilities for cache maintenance and package staging.
//!
//! Provides idempotent removal, flat directory listing, and a recursive copy
//! that preserves symlinks.

use crate::error::{Error, ErrorExt, Result};
use std::{
    io::{self},
    path::Path,
};
use tokio::fs;

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes a file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Names of the regular files directly inside `dir`, sorted.
///
/// Subdirectories and symlinks are skipped. A missing directory lists as empty.
pub async fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).fs_context("reading directory", dir),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading directory entry", dir)?
    {
        let file_type = entry
            .file_type()
            .await
            .fs_context("reading file type", &entry.path())?;
        if file_type.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks. Fails if the source path is not a directory.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry.map_err(|e| Error::GenericError(format!("walking {from:?}: {e}")))?;
            let rel_path = entry
                .path()
                .strip_prefix(&from)
                .map_err(|e| Error::GenericError(e.to_string()))?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("reading symlink", entry.path())?;
                let linked = if entry.path().is_dir() {
                    symlink_dir(&target, &dest_path)
                } else {
                    symlink_file(&target, &dest_path)
                };
                linked.fs_context("creating symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("copying file", &dest_path)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_files_sorted() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("b.pkg"), b"b").unwrap();
        std::fs::write(temp.path().join("a.pkg"), b"a").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        assert_eq!(list_files(temp.path()).await.unwrap(), vec!["a.pkg", "b.pkg"]);
        assert!(list_files(&temp.path().join("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn copies_trees() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("inner")).unwrap();
        std::fs::write(src.join("inner/icon.png"), b"png").unwrap();

        let dst = temp.path().join("stage/Library/Managed Installs/icons");
        copy_dir(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(dst.join("inner/icon.png")).unwrap(), b"png");
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("x");
        std::fs::write(&file, b"x").unwrap();
        remove_file(&file).await.unwrap();
        remove_file(&file).await.unwrap();
    }
}

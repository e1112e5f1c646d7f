//! Installer packages shipped alongside the downloads.
//!
//! Each package is staged in a temporary tree that mirrors its install
//! location, then handed to a [`PackageBuilder`].

use crate::builder::run_tool;
use crate::error::{Error, ErrorExt, Result};
use crate::utils::fs;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Version stamped on every package this tool builds
pub const PACKAGE_VERSION: &str = "1.0";

pub const ICONS_IDENTIFIER: &str = "com.facebook.cpe.munki_icons";
pub const EXCEPTIONS_IDENTIFIER: &str = "com.facebook.cpe.munki_exceptions";
pub const SUPPRESS_REGISTRATION_IDENTIFIER: &str = "com.facebook.cpe.suppress_registration";

/// Builds a flat installer package from a staged root.
#[allow(async_fn_in_trait)]
pub trait PackageBuilder {
    async fn build_package(
        &mut self,
        root: &Path,
        identifier: &str,
        version: &str,
        output: &Path,
    ) -> Result<()>;
}

/// `pkgbuild` from the macOS developer tools.
#[derive(Debug, Clone)]
pub struct Pkgbuild {
    program: PathBuf,
}

impl Pkgbuild {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl PackageBuilder for Pkgbuild {
    async fn build_package(
        &mut self,
        root: &Path,
        identifier: &str,
        version: &str,
        output: &Path,
    ) -> Result<()> {
        log::debug!("Building {} from {}", identifier, root.display());
        let args: [&OsStr; 7] = [
            OsStr::new("--root"),
            root.as_os_str(),
            OsStr::new("--identifier"),
            OsStr::new(identifier),
            OsStr::new("--version"),
            OsStr::new(version),
            output.as_os_str(),
        ];
        run_tool(&self.program, args).await?;
        log::info!("✓ Built package: {}", output.display());
        Ok(())
    }
}

fn staging_dir(prefix: &str) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .map_err(|e| Error::GenericError(format!("Failed to create staging directory: {}", e)))
}

/// Package the icons bucket into `Library/Managed Installs/icons`.
pub async fn build_icons_package<B: PackageBuilder>(
    builder: &mut B,
    icons_dir: &Path,
    output: &Path,
) -> Result<()> {
    let stage = staging_dir("munkiicons")?;
    fs::copy_dir(icons_dir, &stage.path().join("Library/Managed Installs/icons")).await?;
    builder
        .build_package(stage.path(), ICONS_IDENTIFIER, PACKAGE_VERSION, output)
        .await
}

/// Package the exceptions bucket into `Library/Managed Installs/Cache`.
pub async fn build_exceptions_package<B: PackageBuilder>(
    builder: &mut B,
    exceptions_dir: &Path,
    output: &Path,
) -> Result<()> {
    let stage = staging_dir("munkiexcptcache")?;
    fs::copy_dir(
        exceptions_dir,
        &stage.path().join("Library/Managed Installs/Cache"),
    )
    .await?;
    builder
        .build_package(stage.path(), EXCEPTIONS_IDENTIFIER, PACKAGE_VERSION, output)
        .await
}

/// Package the marker files that skip registration and Setup Assistant.
pub async fn build_suppress_registration_package<B: PackageBuilder>(
    builder: &mut B,
    output: &Path,
) -> Result<()> {
    let stage = staging_dir("suppressreg")?;
    let markers = [
        stage.path().join("Library/Receipts/.SetupRegComplete"),
        stage.path().join("private/var/db/.AppleSetupDone"),
    ];
    for marker in &markers {
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(marker, b"")
            .await
            .fs_context("creating marker file", marker)?;
    }
    builder
        .build_package(
            stage.path(),
            SUPPRESS_REGISTRATION_IDENTIFIER,
            PACKAGE_VERSION,
            output,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the staged tree instead of packaging it.
    #[derive(Default)]
    struct Snapshot {
        identifier: String,
        files: Vec<String>,
    }

    impl PackageBuilder for Snapshot {
        async fn build_package(
            &mut self,
            root: &Path,
            identifier: &str,
            version: &str,
            _output: &Path,
        ) -> Result<()> {
            assert_eq!(version, PACKAGE_VERSION);
            self.identifier = identifier.to_string();
            for entry in walkdir::WalkDir::new(root) {
                let entry = entry.unwrap();
                if entry.file_type().is_file() {
                    let rel = entry.path().strip_prefix(root).unwrap();
                    self.files.push(rel.display().to_string());
                }
            }
            self.files.sort();
            Ok(())
        }
    }

    #[tokio::test]
    async fn stages_icons_under_managed_installs() {
        let temp = tempfile::tempdir().unwrap();
        let icons = temp.path().join("icons");
        std::fs::create_dir(&icons).unwrap();
        std::fs::write(icons.join("Firefox.png"), b"png").unwrap();

        let mut snapshot = Snapshot::default();
        build_icons_package(&mut snapshot, &icons, &temp.path().join("out.pkg"))
            .await
            .unwrap();
        assert_eq!(snapshot.identifier, ICONS_IDENTIFIER);
        assert_eq!(snapshot.files, vec!["Library/Managed Installs/icons/Firefox.png"]);
    }

    #[tokio::test]
    async fn stages_exceptions_in_munki_cache() {
        let temp = tempfile::tempdir().unwrap();
        let exceptions = temp.path().join("exceptions");
        std::fs::create_dir(&exceptions).unwrap();
        std::fs::write(exceptions.join("Office.pkg"), b"pkg").unwrap();

        let mut snapshot = Snapshot::default();
        build_exceptions_package(&mut snapshot, &exceptions, &temp.path().join("out.pkg"))
            .await
            .unwrap();
        assert_eq!(snapshot.identifier, EXCEPTIONS_IDENTIFIER);
        assert_eq!(snapshot.files, vec!["Library/Managed Installs/Cache/Office.pkg"]);
    }

    #[tokio::test]
    async fn suppress_registration_contains_markers() {
        let temp = tempfile::tempdir().unwrap();
        let mut snapshot = Snapshot::default();
        build_suppress_registration_package(&mut snapshot, &temp.path().join("out.pkg"))
            .await
            .unwrap();
        assert_eq!(snapshot.identifier, SUPPRESS_REGISTRATION_IDENTIFIER);
        assert_eq!(
            snapshot.files,
            vec![
                "Library/Receipts/.SetupRegComplete",
                "private/var/db/.AppleSetupDone"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pkgbuild_failure_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let mut builder = Pkgbuild::new("false");
        let err = builder
            .build_package(temp.path(), ICONS_IDENTIFIER, "1.0", &temp.path().join("o.pkg"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }
}

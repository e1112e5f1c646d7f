//! External tool lookup.
//!
//! An explicitly configured path always wins; otherwise tools are looked up
//! on `PATH` and finally at their standard macOS location.

use std::path::PathBuf;
use std::sync::LazyLock;

/// Standard location of AutoDMG's command-line entry point
pub const AUTODMG_PATH: &str = "/Applications/AutoDMG.app/Contents/MacOS/AutoDMG";

const PKGBUILD_FALLBACK: &str = "/usr/bin/pkgbuild";

/// `pkgbuild` as found on `PATH`, cached for the run.
pub static PKGBUILD: LazyLock<PathBuf> = LazyLock::new(|| match which::which("pkgbuild") {
    Ok(path) => {
        log::debug!("Found pkgbuild at: {}", path.display());
        path
    }
    Err(e) => {
        log::debug!(
            "pkgbuild not found in PATH: {}. Falling back to {}",
            e,
            PKGBUILD_FALLBACK
        );
        PathBuf::from(PKGBUILD_FALLBACK)
    }
});

/// Resolve the `pkgbuild` executable.
pub fn pkgbuild(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PKGBUILD.clone())
}

/// Resolve the AutoDMG executable.
pub fn autodmg(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(AUTODMG_PATH))
}

/// Whether the process runs as root. AutoDMG then needs `--root`.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    users::get_effective_uid() == 0
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

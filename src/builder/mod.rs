//! Image assembly: installer packages, the AutoDMG template, the AutoDMG
//! invocation, and publishing.

pub mod autodmg;
pub mod options;
pub mod orchestrator;
pub mod packages;
pub mod publish;
pub mod template;
pub mod tool_detection;

pub use autodmg::{AutoDmg, BuildJob, ImageBuilder};
pub use options::BuildOptions;
pub use orchestrator::{BuildOutcome, BuildSummary, CacheBuilder};
pub use packages::{PackageBuilder, Pkgbuild};
pub use template::Template;

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;

/// Run an external tool to completion.
///
/// A non-zero exit becomes [`Error::Tool`] carrying the tool's stderr.
/// Returns the tool's stdout.
pub(crate) async fn run_tool<I, S>(program: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let command = program.display().to_string();
    log::debug!("Running {}", command);

    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Tool {
            command: command.clone(),
            reason: format!("failed to execute: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tool {
            command,
            reason: format!("exit status {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_stdout_on_success() {
        let out = run_tool(Path::new("echo"), ["hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let err = run_tool(Path::new("sh"), ["-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn missing_program_is_a_tool_error() {
        let err = run_tool(Path::new("/nonexistent/tool"), ["x"]).await.unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }
}

//! AutoDMG invocation.

use crate::builder::{run_tool, tool_detection};
use crate::error::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub template: PathBuf,
    pub log_path: PathBuf,
    /// AutoDMG log level, 1 through 7
    pub log_level: u8,
    pub output: PathBuf,
}

/// Builds disk images from a template.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Refresh the builder's list of available system updates.
    async fn update_profiles(&mut self) -> Result<()>;

    /// Build the image described by `job`.
    async fn build(&mut self, job: &BuildJob) -> Result<()>;
}

/// The AutoDMG application's command-line mode.
#[derive(Debug, Clone)]
pub struct AutoDmg {
    program: PathBuf,
    as_root: bool,
}

impl AutoDmg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            as_root: tool_detection::running_as_root(),
        }
    }

    /// Override root detection.
    pub fn as_root(mut self, as_root: bool) -> Self {
        self.as_root = as_root;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn base_args(&self) -> Vec<OsString> {
        if self.as_root {
            vec!["--root".into()]
        } else {
            Vec::new()
        }
    }

    pub fn update_args(&self) -> Vec<OsString> {
        let mut args = self.base_args();
        args.push("update".into());
        args
    }

    pub fn build_args(&self, job: &BuildJob) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend([
            "-L".into(),
            job.log_level.to_string().into(),
            "-l".into(),
            job.log_path.clone().into_os_string(),
            "build".into(),
            job.template.clone().into_os_string(),
            "--download-updates".into(),
            "-o".into(),
            job.output.clone().into_os_string(),
        ]);
        args
    }
}

impl ImageBuilder for AutoDmg {
    async fn update_profiles(&mut self) -> Result<()> {
        log::info!("Updating UpdateProfiles.plist...");
        run_tool(&self.program, self.update_args()).await?;
        Ok(())
    }

    async fn build(&mut self, job: &BuildJob) -> Result<()> {
        if self.as_root {
            log::info!("Running as root.");
        }
        let args = self.build_args(job);
        log::info!(
            "Full command: {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        run_tool(&self.program, args).await?;
        log::info!("✓ Built disk image: {}", job.output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> BuildJob {
        BuildJob {
            template: PathBuf::from("/Library/AutoDMG/AutoDMG-full.adtmpl"),
            log_path: PathBuf::from("/Users/Shared/AutoDMG_build.log"),
            log_level: 6,
            output: PathBuf::from("/Library/AutoDMG/AutoDMG_full.hfs.dmg"),
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn build_arguments_match_autodmg_cli() {
        let autodmg = AutoDmg::new(tool_detection::AUTODMG_PATH).as_root(false);
        assert_eq!(
            strings(autodmg.build_args(&job())),
            vec![
                "-L",
                "6",
                "-l",
                "/Users/Shared/AutoDMG_build.log",
                "build",
                "/Library/AutoDMG/AutoDMG-full.adtmpl",
                "--download-updates",
                "-o",
                "/Library/AutoDMG/AutoDMG_full.hfs.dmg",
            ]
        );
    }

    #[test]
    fn root_flag_leads_every_invocation() {
        let autodmg = AutoDmg::new(tool_detection::AUTODMG_PATH).as_root(true);
        assert_eq!(strings(autodmg.update_args()), vec!["--root", "update"]);
        assert_eq!(strings(autodmg.build_args(&job()))[..3], ["--root", "-L", "6"]);
    }
}

//! Command line argument parsing and validation.
//!
//! Flags are parsed with clap, then resolved against the environment and the
//! Munki client preferences into a [`RuntimeConfig`]. Every configuration
//! problem surfaces here, before any network activity.

use crate::builder::{BuildOptions, tool_detection};
use crate::cache::{Extras, SweepPolicy};
use crate::cli::prefs::{DEFAULT_PREFS_PATH, MunkiPrefs};
use crate::error::{ConfigError, Result};
use crate::repo::RepoUrls;
use crate::repo::http::parse_headers;
use clap::Parser;
use std::path::PathBuf;

/// Build a precached AutoDMG image from a Munki repository
#[derive(Parser, Debug, Clone)]
#[command(
    name = "autodmg_cache_build",
    version,
    about = "Build a precached AutoDMG image.",
    long_about = "Resolves a Munki manifest against its catalogs, caches every package it \
requires under the cache directory, and builds an AutoDMG image that installs them.

Usage:
  autodmg_cache_build --munkirepo http://munki.example.com/repo
  autodmg_cache_build -r https://munki.example.com/repo -a 'Authorization: Basic Zm9vOmJhcg=='
  autodmg_cache_build -m lab -c testing -c prod --extras extras.json --dsrepo /Volumes/DS

Exit code 0 = image built or already up to date, 2 = configuration error."
)]
pub struct Args {
    /// Catalog name, repeat to search several catalogs in order
    #[arg(short = 'c', long = "catalog", value_name = "NAME", default_value = "prod")]
    pub catalogs: Vec<String>,

    /// Manifest name
    #[arg(short, long, value_name = "NAME", default_value = "prod")]
    pub manifest: String,

    /// File name of the DMG to create inside the cache
    #[arg(short, long, value_name = "PATH", default_value = "AutoDMG_full.hfs.dmg")]
    pub output: PathBuf,

    /// Path to local cache to store files
    #[arg(long, value_name = "DIR", default_value = "/Library/AutoDMG")]
    pub cache: PathBuf,

    /// Force a redownload of all files
    #[arg(short, long)]
    pub download: bool,

    /// Force building a DMG
    #[arg(short, long)]
    pub force: bool,

    /// Path to log file for AutoDMG
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = "/Users/Shared/AutoDMG_build.log"
    )]
    pub logpath: PathBuf,

    /// URL of the Munki repo. Defaults to SoftwareRepoURL from Munki prefs
    #[arg(short = 'r', long, value_name = "URL", env = "MUNKI_REPO_URL")]
    pub munkirepo: Option<String>,

    /// Additional HTTP header `Name: value`, repeatable. Defaults to
    /// AdditionalHttpHeaders from Munki prefs
    #[arg(short, long = "auth", value_name = "HEADER")]
    pub auth: Vec<String>,

    /// Path to base OS installer
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = "/Applications/Install OS X Yosemite.app"
    )]
    pub source: PathBuf,

    /// Name of volume after imaging
    #[arg(short = 'v', long, value_name = "NAME", default_value = "Macintosh HD")]
    pub volumename: String,

    /// AutoDMG log level between 1 and 7
    #[arg(
        long,
        value_name = "LEVEL",
        default_value_t = 6,
        value_parser = clap::value_parser!(u8).range(1..=7)
    )]
    pub loglevel: u8,

    /// Path to DeployStudio repo
    #[arg(long, value_name = "DIR")]
    pub dsrepo: Option<PathBuf>,

    /// Don't cache icons
    #[arg(long)]
    pub noicons: bool,

    /// Update the profiles plist
    #[arg(short, long)]
    pub update: bool,

    /// Path to JSON file containing additions and exceptions lists
    #[arg(long, value_name = "PATH")]
    pub extras: Option<PathBuf>,

    /// Keep cached copies of packages whose download failed this run
    #[arg(long)]
    pub preserve_failed: bool,

    /// AutoDMG executable
    #[arg(long, value_name = "PATH", env = "AUTODMG_PATH")]
    pub autodmg: Option<PathBuf>,

    /// pkgbuild executable. Defaults to pkgbuild on PATH
    #[arg(long, value_name = "PATH")]
    pub pkgbuild: Option<PathBuf>,

    /// Munki client preferences
    #[arg(long, value_name = "PATH", env = "MUNKI_PREFS", default_value = DEFAULT_PREFS_PATH)]
    pub prefs: PathBuf,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.manifest.trim().is_empty() {
            return Err("Manifest name cannot be empty".to_string());
        }
        if self.catalogs.iter().any(|c| c.trim().is_empty()) {
            return Err("Catalog names cannot be empty".to_string());
        }
        if self.output.file_name().is_none() {
            return Err(format!("Invalid output path: {}", self.output.display()));
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments, environment, and prefs
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub repo: RepoUrls,
    /// Custom headers sent with every request
    pub headers: Vec<String>,
    pub cache: PathBuf,
    pub autodmg: PathBuf,
    pub pkgbuild: PathBuf,
    pub options: BuildOptions,
}

impl RuntimeConfig {
    /// Resolve `args` against the Munki preferences named by `args.prefs`.
    pub fn resolve(args: &Args) -> Result<Self> {
        args.validate().map_err(ConfigError::InvalidArgument)?;
        Self::resolve_with(args, MunkiPrefs::load(&args.prefs))
    }

    /// Resolve `args` against already loaded preferences.
    ///
    /// Command line and environment win over preferences. An HTTPS
    /// repository requires at least one header.
    pub fn resolve_with(args: &Args, prefs: MunkiPrefs) -> Result<Self> {
        let url = args
            .munkirepo
            .clone()
            .or(prefs.software_repo_url)
            .ok_or(ConfigError::MissingRepository)?;
        let repo = RepoUrls::new(&url)?;

        let headers = if args.auth.is_empty() {
            prefs.additional_http_headers
        } else {
            args.auth.clone()
        };
        if repo.is_https() && parse_headers(&headers)?.is_empty() {
            return Err(ConfigError::HttpsWithoutAuth.into());
        }

        let extras = match &args.extras {
            Some(path) => Extras::load(path)?,
            None => Extras::default(),
        };

        let sweep_policy = if args.preserve_failed {
            SweepPolicy::PreserveFailed
        } else {
            SweepPolicy::Purge
        };

        Ok(Self {
            repo,
            headers,
            cache: args.cache.clone(),
            autodmg: tool_detection::autodmg(args.autodmg.clone()),
            pkgbuild: tool_detection::pkgbuild(args.pkgbuild.clone()),
            options: BuildOptions {
                manifest: args.manifest.clone(),
                catalogs: args.catalogs.clone(),
                output: args.output.clone(),
                source: args.source.clone(),
                volume_name: args.volumename.clone(),
                log_path: args.logpath.clone(),
                log_level: args.loglevel,
                force_download: args.download,
                force_build: args.force,
                no_icons: args.noicons,
                update_profiles: args.update,
                dsrepo: args.dsrepo.clone(),
                sweep_policy,
                extras,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["autodmg_cache_build", "--prefs", "/nonexistent/prefs.plist"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_historical_tool() {
        let args = parse(&["-r", "http://munki.example.com/repo"]);
        assert_eq!(args.catalogs, vec!["prod"]);
        assert_eq!(args.manifest, "prod");
        assert_eq!(args.output, PathBuf::from("AutoDMG_full.hfs.dmg"));
        assert_eq!(args.cache, PathBuf::from("/Library/AutoDMG"));
        assert_eq!(args.loglevel, 6);
        assert_eq!(args.volumename, "Macintosh HD");
        assert!(!args.download && !args.force && !args.noicons && !args.update);
    }

    #[test]
    fn catalogs_and_headers_repeat() {
        let args = parse(&[
            "-r",
            "https://munki.example.com",
            "-c",
            "testing",
            "-c",
            "prod",
            "-a",
            "Authorization: Basic eA==",
            "-a",
            "X-Site: lab",
        ]);
        assert_eq!(args.catalogs, vec!["testing", "prod"]);
        assert_eq!(args.auth.len(), 2);
    }

    #[test]
    fn loglevel_out_of_range_is_rejected() {
        let argv = ["autodmg_cache_build", "--loglevel", "8"];
        assert!(Args::try_parse_from(argv).is_err());
        let argv = ["autodmg_cache_build", "--loglevel", "0"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn https_without_headers_is_a_config_error() {
        let args = parse(&["-r", "https://munki.example.com/repo"]);
        let err = RuntimeConfig::resolve_with(&args, MunkiPrefs::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::HttpsWithoutAuth)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn prefs_fill_in_repo_and_headers() {
        let mut args = parse(&[]);
        args.munkirepo = None;
        let prefs = MunkiPrefs {
            software_repo_url: Some("https://munki.example.com/repo/".to_string()),
            additional_http_headers: vec!["Authorization: Basic eA==".to_string()],
        };
        let config = RuntimeConfig::resolve_with(&args, prefs).unwrap();
        assert_eq!(config.repo.base(), "https://munki.example.com/repo");
        assert_eq!(config.headers, vec!["Authorization: Basic eA=="]);
    }

    #[test]
    fn command_line_wins_over_prefs() {
        let args = parse(&["-r", "http://cli.example.com", "-a", "X-Token: cli"]);
        let prefs = MunkiPrefs {
            software_repo_url: Some("https://prefs.example.com".to_string()),
            additional_http_headers: vec!["X-Token: prefs".to_string()],
        };
        let config = RuntimeConfig::resolve_with(&args, prefs).unwrap();
        assert_eq!(config.repo.base(), "http://cli.example.com");
        assert_eq!(config.headers, vec!["X-Token: cli"]);
    }

    #[test]
    fn missing_repository_is_a_config_error() {
        let mut args = parse(&[]);
        args.munkirepo = None;
        let err = RuntimeConfig::resolve_with(&args, MunkiPrefs::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingRepository)));
    }

    #[test]
    fn preserve_failed_selects_policy() {
        let args = parse(&["-r", "http://munki.example.com", "--preserve-failed", "--noicons"]);
        let config = RuntimeConfig::resolve_with(&args, MunkiPrefs::default()).unwrap();
        assert_eq!(config.options.sweep_policy, SweepPolicy::PreserveFailed);
        assert!(config.options.no_icons);
    }

    #[test]
    fn empty_catalog_name_fails_validation() {
        let args = parse(&["-r", "http://munki.example.com", "-c", ""]);
        assert!(args.validate().is_err());
    }
}

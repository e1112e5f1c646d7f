//! Command line interface for the cache builder.
//!
//! Parses arguments, resolves configuration, prepares the cache, and runs
//! the [`CacheBuilder`] with the production fetcher and tools.

mod args;
pub mod prefs;

pub use args::{Args, RuntimeConfig};

use crate::builder::{AutoDmg, BuildOutcome, CacheBuilder, Pkgbuild};
use crate::cache::CacheLayout;
use crate::error::Result;
use crate::repo::{HttpFetcher, Repository, ValidatorStore};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Run a full build for already parsed arguments.
pub async fn execute(args: &Args) -> Result<i32> {
    let config = RuntimeConfig::resolve(args)?;
    log::info!("Using Munki repo: {}", config.repo.base());
    log::debug!("Sending {} additional headers", config.headers.len());

    log::info!("{}", chrono::Local::now().format("%c"));
    log::info!("Starting run...");

    let layout = CacheLayout::new(&config.cache);
    layout.create_all().await?;

    let fetcher = HttpFetcher::new(&config.headers, ValidatorStore::load(&layout.fetch_state()))?;
    let repo = Repository::new(config.repo, layout, fetcher);
    let mut builder = CacheBuilder::new(
        repo,
        Pkgbuild::new(config.pkgbuild),
        AutoDmg::new(config.autodmg),
        config.options,
    );

    match builder.run().await? {
        BuildOutcome::Unchanged(_) => {}
        BuildOutcome::Built {
            image, published, ..
        } => {
            log::info!("✓ Image ready: {}", image.display());
            if let Some(published) = published {
                log::info!("✓ Published to {}", published.display());
            }
        }
    }

    log::info!("Ending run.");
    log::info!("{}", chrono::Local::now().format("%c"));
    Ok(0)
}

//! Additional packages from the extras file.
//!
//! Remote entries are cached in the additions bucket, which is swept to the
//! current list like every other bucket. Local entries are used as-is.

use crate::cache::layout::Bucket;
use crate::cache::reconcile::{BucketReport, SweepPolicy, sweep};
use crate::error::Result;
use crate::repo::client::Repository;
use crate::repo::fetch::{FetchRequest, Fetcher};
use crate::repo::urls::url_basename;
use std::path::PathBuf;

/// Outcome of caching the additions list.
#[derive(Debug, Clone, Default)]
pub struct AdditionsReport {
    /// Packages to add to the template, in list order
    pub packages: Vec<PathBuf>,
    pub bucket: BucketReport,
}

fn is_remote(entry: &str) -> bool {
    entry.starts_with("http://") || entry.starts_with("https://")
}

/// Fetch remote additions and resolve the package list.
///
/// A remote addition that cannot be fetched is left out of the package list.
pub async fn cache_additions<F: Fetcher>(
    repo: &mut Repository<F>,
    additions: &[String],
    force: bool,
    policy: SweepPolicy,
) -> Result<AdditionsReport> {
    let dir = repo.layout().bucket(Bucket::Additions);
    let mut report = AdditionsReport::default();

    if !additions.is_empty() {
        log::info!("Adding additional packages.");
    }
    for addition in additions {
        if !is_remote(addition) {
            log::info!("Adding {} locally", addition);
            report.packages.push(PathBuf::from(addition));
            continue;
        }

        log::info!("Considering {}", addition);
        match repo.fetch(FetchRequest::new(addition, &dir).force(force)).await {
            Ok(outcome) => {
                if outcome.changed {
                    report.bucket.fetched += 1;
                } else {
                    log::info!("Considering {} in cache", outcome.file_name());
                }
                report.bucket.kept.insert(outcome.file_name());
                report.packages.push(outcome.path);
            }
            Err(e) if e.is_fetch_failure() => {
                log::warn!("Download error for {}: {}", addition, e);
                if let Ok(name) = url_basename(addition) {
                    report.bucket.failed.insert(name);
                }
            }
            Err(e) => return Err(e),
        }
    }

    report.bucket.removed = sweep(repo, &dir, &report.bucket, policy).await?;
    Ok(report)
}

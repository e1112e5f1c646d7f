//! Cache reconciliation.
//!
//! Fetches every artifact the resolved identifiers require into its bucket,
//! then sweeps each bucket so it holds exactly the files this run kept.
//!
//! # Failure policy
//!
//! A network failure for one artifact is logged and processing continues.
//! Under [`SweepPolicy::Purge`] the artifact is not kept and a previously
//! cached copy is deleted by the sweep, forcing a clean fetch next run. Under
//! [`SweepPolicy::PreserveFailed`] the previous copy survives. Local I/O
//! errors while fetching abort the run instead, so a broken disk never
//! empties the cache.

use crate::cache::layout::Bucket;
use crate::error::Result;
use crate::munki::catalog::{CatalogIndex, ItemSource};
use crate::repo::client::Repository;
use crate::repo::fetch::{FetchRequest, Fetcher, PARTIAL_SUFFIX};
use crate::repo::urls::url_basename;
use crate::utils::fs;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// What the sweep does with files whose fetch failed this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Delete them along with every other unreferenced file
    #[default]
    Purge,
    /// Leave previously cached copies in place
    PreserveFailed,
}

/// Per-bucket outcome of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketReport {
    /// Files whose content changed this run
    pub fetched: usize,
    /// File names the bucket must contain
    pub kept: BTreeSet<String>,
    /// File names whose fetch failed
    pub failed: BTreeSet<String>,
    /// File names deleted by the sweep
    pub removed: Vec<String>,
}

impl BucketReport {
    /// Whether the bucket's contents differ from before the run
    pub fn changed(&self) -> bool {
        self.fetched > 0 || !self.removed.is_empty()
    }

    fn record(&mut self, name: String, changed: bool) {
        if changed {
            self.fetched += 1;
        }
        self.kept.insert(name);
    }
}

/// Outcome of reconciling the managed installs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub downloads: BucketReport,
    pub exceptions: BucketReport,
    /// Identifiers resolving to `nopkg` items
    pub nopkg: Vec<String>,
    /// Identifiers found in no catalog, or without a payload
    pub unresolved: Vec<String>,
}

impl ReconcileReport {
    pub fn fetched(&self) -> usize {
        self.downloads.fetched
    }

    pub fn exception_fetched(&self) -> usize {
        self.exceptions.fetched
    }
}

/// Reconciles cache buckets against a catalog index.
pub struct Reconciler<'a, F> {
    repo: &'a mut Repository<F>,
    index: &'a CatalogIndex,
    policy: SweepPolicy,
}

impl<'a, F: Fetcher> Reconciler<'a, F> {
    pub fn new(repo: &'a mut Repository<F>, index: &'a CatalogIndex) -> Self {
        Self {
            repo,
            index,
            policy: SweepPolicy::default(),
        }
    }

    pub fn policy(mut self, policy: SweepPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the installer items of `required` and sweep the downloads and
    /// exceptions buckets.
    ///
    /// Identifiers are processed in order; duplicates are fetched again,
    /// which is harmless since fetching is idempotent. An item whose file name
    /// appears in `exceptions` goes to the exceptions bucket.
    pub async fn reconcile(
        &mut self,
        required: &[String],
        exceptions: &HashSet<String>,
        catalogs: &[String],
        force: bool,
    ) -> Result<ReconcileReport> {
        let downloads_dir = self.repo.layout().bucket(Bucket::Downloads);
        let exceptions_dir = self.repo.layout().bucket(Bucket::Exceptions);
        let index = self.index;
        let mut report = ReconcileReport::default();

        log::info!("Checking for managed installs...");
        for identifier in required {
            let Some(item) = index.resolve(identifier, catalogs) else {
                log::warn!("{} not found in catalogs {:?}, skipping", identifier, catalogs);
                report.unresolved.push(identifier.clone());
                continue;
            };

            let url = match item.source(self.repo.urls()) {
                ItemSource::NoPkg => {
                    log::info!("Nopkg found: {}", identifier);
                    report.nopkg.push(identifier.clone());
                    continue;
                }
                ItemSource::Missing => {
                    log::warn!("{} has no installer item, skipping", identifier);
                    report.unresolved.push(identifier.clone());
                    continue;
                }
                ItemSource::Package(url) => url,
            };

            let name = match url_basename(&url) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("{} has an unusable location: {}", identifier, e);
                    report.unresolved.push(identifier.clone());
                    continue;
                }
            };
            let (bucket, dir) = if exceptions.contains(&name) {
                (&mut report.exceptions, &exceptions_dir)
            } else {
                (&mut report.downloads, &downloads_dir)
            };

            log::info!("Downloading: {}", identifier);
            let request = FetchRequest::new(&url, dir)
                .expected_hash(item.hash())
                .force(force);
            match self.repo.fetch(request).await {
                Ok(outcome) => {
                    if !outcome.changed {
                        log::info!("Found {} in cache", identifier);
                    }
                    bucket.record(outcome.file_name(), outcome.changed);
                }
                Err(e) if e.is_fetch_failure() => {
                    log::warn!("Download error for {}: {}", identifier, e);
                    bucket.failed.insert(name);
                }
                Err(e) => return Err(e),
            }
        }

        report.downloads.removed = self.sweep(&downloads_dir, &report.downloads).await?;
        report.exceptions.removed = self.sweep(&exceptions_dir, &report.exceptions).await?;
        Ok(report)
    }

    /// Fetch icons of the optional installs and sweep the icons bucket.
    ///
    /// Items without an icon, and identifiers found in no catalog, are skipped.
    pub async fn reconcile_icons(
        &mut self,
        optionals: &[String],
        catalogs: &[String],
    ) -> Result<BucketReport> {
        let icons_dir = self.repo.layout().bucket(Bucket::Icons);
        let index = self.index;
        let mut report = BucketReport::default();

        log::info!("Checking for icons...");
        for identifier in optionals {
            let Some(item) = index.resolve(identifier, catalogs) else {
                log::warn!("{} not found in catalogs {:?}, skipping", identifier, catalogs);
                continue;
            };
            let Some(url) = item.icon_url(self.repo.urls()) else {
                log::debug!("{} has no icon", identifier);
                continue;
            };
            let Ok(name) = url_basename(&url) else {
                log::warn!("{} has an unusable icon URL {}", identifier, url);
                continue;
            };

            match self.repo.fetch(FetchRequest::new(&url, &icons_dir)).await {
                Ok(outcome) => {
                    if outcome.changed {
                        log::info!("Downloaded icon {}", identifier);
                    }
                    report.record(outcome.file_name(), outcome.changed);
                }
                Err(e) if e.is_fetch_failure() => {
                    log::warn!("Icon download error for {}: {}", identifier, e);
                    report.failed.insert(name);
                }
                Err(e) => return Err(e),
            }
        }

        report.removed = self.sweep(&icons_dir, &report).await?;
        Ok(report)
    }

    async fn sweep(&mut self, dir: &Path, report: &BucketReport) -> Result<Vec<String>> {
        sweep(&mut *self.repo, dir, report, self.policy).await
    }
}

/// Sweep `dir` and drop the fetcher state of every removed file.
pub async fn sweep<F: Fetcher>(
    repo: &mut Repository<F>,
    dir: &Path,
    report: &BucketReport,
    policy: SweepPolicy,
) -> Result<Vec<String>> {
    let removed = sweep_bucket(dir, report, policy).await?;
    for name in &removed {
        repo.forget(&dir.join(name))?;
    }
    Ok(removed)
}

/// Delete every regular file in `dir` the bucket no longer needs.
///
/// Kept files stay. Failed files stay under [`SweepPolicy::PreserveFailed`].
/// The partial download of a failed file always stays so the next run can
/// resume it. Returns the removed names.
pub async fn sweep_bucket(
    dir: &Path,
    report: &BucketReport,
    policy: SweepPolicy,
) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for name in fs::list_files(dir).await? {
        if report.kept.contains(&name) {
            continue;
        }
        if policy == SweepPolicy::PreserveFailed && report.failed.contains(&name) {
            log::info!("Keeping {} after failed download", name);
            continue;
        }
        if let Some(target) = name.strip_suffix(PARTIAL_SUFFIX) {
            if report.failed.contains(target) {
                log::debug!("Keeping partial download {}", name);
                continue;
            }
        }
        log::info!("Removing: {}", name);
        fs::remove_file(&dir.join(&name)).await?;
        removed.push(name);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn sweep_removes_unreferenced_files() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["A", "B", "C"] {
            std::fs::write(temp.path().join(name), name).unwrap();
        }
        let report = BucketReport {
            kept: names(&["A", "C"]),
            ..Default::default()
        };

        let removed = sweep_bucket(temp.path(), &report, SweepPolicy::Purge).await.unwrap();
        assert_eq!(removed, vec!["B"]);
        assert_eq!(fs::list_files(temp.path()).await.unwrap(), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn sweep_spares_failed_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("A"), "a").unwrap();
        std::fs::write(temp.path().join("B"), "b").unwrap();
        let report = BucketReport {
            failed: names(&["B"]),
            ..Default::default()
        };

        let removed = sweep_bucket(temp.path(), &report, SweepPolicy::PreserveFailed)
            .await
            .unwrap();
        assert_eq!(removed, vec!["A"]);
        assert!(temp.path().join("B").exists());
    }

    #[tokio::test]
    async fn sweep_keeps_partial_of_failed_download() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["B.pkg", "B.pkg.partial", "C.pkg.partial"] {
            std::fs::write(temp.path().join(name), name).unwrap();
        }
        let report = BucketReport {
            failed: names(&["B.pkg"]),
            ..Default::default()
        };

        let removed = sweep_bucket(temp.path(), &report, SweepPolicy::PreserveFailed)
            .await
            .unwrap();
        assert_eq!(removed, vec!["C.pkg.partial"]);

        let removed = sweep_bucket(temp.path(), &report, SweepPolicy::Purge)
            .await
            .unwrap();
        assert_eq!(removed, vec!["B.pkg"]);
        assert_eq!(
            fs::list_files(temp.path()).await.unwrap(),
            vec!["B.pkg.partial"]
        );
    }

    #[tokio::test]
    async fn sweep_leaves_directories() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        let removed = sweep_bucket(temp.path(), &BucketReport::default(), SweepPolicy::Purge)
            .await
            .unwrap();
        assert!(removed.is_empty());
        assert!(temp.path().join("nested").is_dir());
    }

    #[test]
    fn bucket_change_tracking() {
        let mut report = BucketReport::default();
        assert!(!report.changed());
        report.record("a.pkg".into(), false);
        assert!(!report.changed());
        report.removed.push("old.pkg".into());
        assert!(report.changed());
    }
}

//! Cache build orchestration.
//!
//! This module provides the [`CacheBuilder`] orchestrator that runs a full
//! build: resolve the manifest against the catalogs, reconcile the cache,
//! build the support packages, write the template, and drive AutoDMG.

use crate::builder::autodmg::{BuildJob, ImageBuilder};
use crate::builder::options::BuildOptions;
use crate::builder::packages::{self, PackageBuilder};
use crate::builder::publish::publish_to_deploystudio;
use crate::builder::template::{Template, collect_packages};
use crate::cache::additions::{AdditionsReport, cache_additions};
use crate::cache::layout::{Bucket, CacheLayout};
use crate::cache::reconcile::{BucketReport, ReconcileReport, Reconciler};
use crate::error::Result;
use crate::munki::catalog::CatalogIndex;
use crate::munki::manifest::ManifestTree;
use crate::repo::client::Repository;
use crate::repo::fetch::Fetcher;
use crate::utils::fs;
use std::path::PathBuf;

/// What a run found and changed.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    /// Flattened managed installs of the manifest tree
    pub installs: Vec<String>,
    /// Optional installs of the root manifest
    pub optionals: Vec<String>,
    pub reconcile: ReconcileReport,
    /// `None` when icons are disabled
    pub icons: Option<BucketReport>,
    pub additions: AdditionsReport,
    /// Support packages rebuilt this run
    pub packages_built: Vec<PathBuf>,
    /// Template package list, in order
    pub packages: Vec<String>,
    /// Changed downloads, additions and rebuilt packages
    pub total_adds: usize,
    /// Changed exceptions
    pub total_excepts: usize,
}

impl BuildSummary {
    pub fn total(&self) -> usize {
        self.total_adds + self.total_excepts
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Nothing changed and the image already exists
    Unchanged(BuildSummary),
    /// A new image was built
    Built {
        summary: BuildSummary,
        image: PathBuf,
        /// Location in the DeployStudio repository, when publishing
        published: Option<PathBuf>,
    },
}

impl BuildOutcome {
    pub fn summary(&self) -> &BuildSummary {
        match self {
            BuildOutcome::Unchanged(summary) => summary,
            BuildOutcome::Built { summary, .. } => summary,
        }
    }
}

/// Main cache build orchestrator.
///
/// Owns the repository and the external tools for the duration of a run.
/// Steps run strictly in order; the first fatal error ends the run.
///
/// # Examples
///
/// ```no_run
/// use autodmg_cache_builder::builder::{AutoDmg, BuildOptions, CacheBuilder, Pkgbuild};
/// use autodmg_cache_builder::cache::CacheLayout;
/// use autodmg_cache_builder::repo::{HttpFetcher, RepoUrls, Repository, ValidatorStore};
///
/// # async fn example() -> autodmg_cache_builder::Result<()> {
/// let layout = CacheLayout::new("/Library/AutoDMG");
/// let fetcher = HttpFetcher::new(&[], ValidatorStore::load(&layout.fetch_state()))?;
/// let repo = Repository::new(RepoUrls::new("http://munki.example.com/repo")?, layout, fetcher);
///
/// let mut builder = CacheBuilder::new(
///     repo,
///     Pkgbuild::new("/usr/bin/pkgbuild"),
///     AutoDmg::new("/Applications/AutoDMG.app/Contents/MacOS/AutoDMG"),
///     BuildOptions::default(),
/// );
/// let outcome = builder.run().await?;
/// println!("{} changes", outcome.summary().total());
/// # Ok(())
/// # }
/// ```
pub struct CacheBuilder<F, P, I> {
    repo: Repository<F>,
    packager: P,
    imager: I,
    options: BuildOptions,
}

impl<F: Fetcher, P: PackageBuilder, I: ImageBuilder> CacheBuilder<F, P, I> {
    pub fn new(repo: Repository<F>, packager: P, imager: I, options: BuildOptions) -> Self {
        Self {
            repo,
            packager,
            imager,
            options,
        }
    }

    pub fn repository(&self) -> &Repository<F> {
        &self.repo
    }

    pub fn packager(&self) -> &P {
        &self.packager
    }

    pub fn imager(&self) -> &I {
        &self.imager
    }

    fn layout(&self) -> &CacheLayout {
        self.repo.layout()
    }

    /// Run every step and report the outcome.
    ///
    /// # Steps
    /// 1. Build the catalog index and load the manifest tree
    /// 2. Cache the additions list
    /// 3. Reconcile downloads and exceptions
    /// 4. Reconcile icons and rebuild the icons package
    /// 5. Rebuild the exceptions and registration-suppression packages
    /// 6. Stop early when nothing changed and the image exists
    /// 7. Write the template, run AutoDMG, publish
    pub async fn run(&mut self) -> Result<BuildOutcome> {
        let mut summary = self.cache().await?;

        let image = self.layout().image(&self.options.output);
        if !self.options.force_build && image.is_file() && summary.total() == 0 {
            log::info!("No changes to manifest or catalog, DMG exists. Stopping.");
            return Ok(BuildOutcome::Unchanged(summary));
        }

        let template_path = self.layout().template();
        let mut additions = summary.additions.packages.clone();
        additions.extend(self.support_packages());
        summary.packages = collect_packages(
            &self.layout().bucket(Bucket::Downloads),
            &self.options.extras.exceptions(),
            &additions,
        )
        .await?;

        log::info!("Creating {}.", CacheLayout::TEMPLATE);
        Template::new(
            &self.options.source,
            &self.options.volume_name,
            summary.packages.clone(),
        )
        .write(&template_path)?;

        if self.options.update_profiles {
            self.imager.update_profiles().await?;
        }

        log::info!("Building disk image...");
        fs::remove_file(&image).await?;
        let job = BuildJob {
            template: template_path,
            log_path: self.options.log_path.clone(),
            log_level: self.options.log_level,
            output: image.clone(),
        };
        self.imager.build(&job).await?;

        let published = match &self.options.dsrepo {
            Some(dsrepo) => Some(publish_to_deploystudio(&image, dsrepo).await?),
            None => None,
        };

        Ok(BuildOutcome::Built {
            summary,
            image,
            published,
        })
    }

    /// Bring the cache and support packages up to date without building.
    pub async fn cache(&mut self) -> Result<BuildSummary> {
        let mut summary = BuildSummary::default();
        let catalogs = self.options.catalogs.clone();
        let force = self.options.force_download;

        let index = CatalogIndex::build(&mut self.repo, &catalogs).await?;
        let tree = ManifestTree::load(&mut self.repo, &self.options.manifest).await?;
        summary.installs = tree.resolve_installs();
        summary.optionals = tree.resolve_optionals();

        summary.additions = cache_additions(
            &mut self.repo,
            &self.options.extras.additions_list,
            force,
            self.options.sweep_policy,
        )
        .await?;
        summary.total_adds += summary.additions.bucket.fetched;

        let exceptions = self.options.extras.exceptions();
        log::info!("Exceptions list: {:?}", self.options.extras.exceptions_list);
        let mut reconciler =
            Reconciler::new(&mut self.repo, &index).policy(self.options.sweep_policy);
        summary.reconcile = reconciler
            .reconcile(&summary.installs, &exceptions, &catalogs, force)
            .await?;
        let icons = if self.options.no_icons {
            None
        } else {
            Some(reconciler.reconcile_icons(&summary.optionals, &catalogs).await?)
        };

        let downloads = &summary.reconcile.downloads;
        summary.total_adds += downloads.fetched + downloads.removed.len();
        summary.total_adds += summary.additions.bucket.removed.len();
        let excepts = &summary.reconcile.exceptions;
        summary.total_excepts = excepts.fetched + excepts.removed.len();

        if let Some(icons) = &icons {
            let output = self.layout().icons_pkg();
            if icons.changed() || !output.is_file() {
                log::info!("Creating the icon package.");
                let icons_dir = self.layout().bucket(Bucket::Icons);
                packages::build_icons_package(&mut self.packager, &icons_dir, &output).await?;
                summary.packages_built.push(output);
            } else {
                log::info!("No new icons, using existing icon package.");
            }
        }
        summary.icons = icons;

        let output = self.layout().exceptions_pkg();
        if summary.reconcile.exceptions.changed() || !output.is_file() {
            log::info!("Building exceptions package");
            let exceptions_dir = self.layout().bucket(Bucket::Exceptions);
            packages::build_exceptions_package(&mut self.packager, &exceptions_dir, &output)
                .await?;
            summary.packages_built.push(output);
        } else {
            log::info!("No new exceptions, using existing exceptions package.");
        }

        log::info!("Building in Registration suppression...");
        let output = self.layout().suppress_registration_pkg();
        if !output.is_file() {
            packages::build_suppress_registration_package(&mut self.packager, &output).await?;
            summary.packages_built.push(output);
        }

        summary.total_adds += summary.packages_built.len();
        log::info!(
            "✓ Cache up to date: {} additions, {} exceptions changed",
            summary.total_adds,
            summary.total_excepts
        );
        Ok(summary)
    }

    /// Support packages in template order.
    fn support_packages(&self) -> Vec<PathBuf> {
        let mut packages = Vec::new();
        if !self.options.no_icons {
            packages.push(self.layout().icons_pkg());
        }
        packages.push(self.layout().exceptions_pkg());
        packages.push(self.layout().suppress_registration_pkg());
        packages
    }
}

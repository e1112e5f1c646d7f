//! Shared fixtures: an in-memory repository and recording tool fakes.

#![allow(dead_code)]

use autodmg_cache_builder::builder::{BuildJob, ImageBuilder, PackageBuilder};
use autodmg_cache_builder::cache::CacheLayout;
use autodmg_cache_builder::munki::{CatalogItem, Manifest};
use autodmg_cache_builder::repo::urls::url_basename;
use autodmg_cache_builder::repo::{FetchOutcome, FetchRequest, Fetcher, RepoUrls, Repository};
use autodmg_cache_builder::utils::checksum::bytes_sha256;
use autodmg_cache_builder::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const REPO: &str = "http://munki.test/repo";

/// Serves URLs from memory, writing into the destination directory the way
/// the HTTP fetcher does. Identical content already on disk is unchanged.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pub resources: HashMap<String, Vec<u8>>,
    /// URLs that fail as if the server were unreachable
    pub failing: HashSet<String>,
    /// URLs whose content was written, in order
    pub downloads: Vec<String>,
    pub requests: usize,
    /// Paths passed to `forget`, in order
    pub forgotten: Vec<PathBuf>,
}

impl FakeFetcher {
    pub fn serve(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.resources.insert(url.into(), body.into());
    }

    pub fn fail(&mut self, url: impl Into<String>) {
        self.failing.insert(url.into());
    }

    pub fn reset_counters(&mut self) {
        self.downloads.clear();
        self.requests = 0;
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&mut self, request: FetchRequest<'_>) -> Result<FetchOutcome> {
        self.requests += 1;
        if self.failing.contains(request.url) {
            return Err(Error::Fetch {
                url: request.url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let body = self.resources.get(request.url).ok_or_else(|| Error::Fetch {
            url: request.url.to_string(),
            reason: "404 Not Found".to_string(),
        })?;

        let path = request.dest_dir.join(url_basename(request.url)?);
        if !request.force && std::fs::read(&path).ok().as_deref() == Some(body.as_slice()) {
            return Ok(FetchOutcome {
                path,
                changed: false,
            });
        }

        std::fs::create_dir_all(request.dest_dir)?;
        std::fs::write(&path, body)?;
        self.downloads.push(request.url.to_string());
        Ok(FetchOutcome {
            path,
            changed: true,
        })
    }

    fn forget(&mut self, path: &Path) -> Result<()> {
        self.forgotten.push(path.to_path_buf());
        Ok(())
    }
}

/// Records package builds and writes a placeholder package.
#[derive(Debug, Default)]
pub struct RecordingPackager {
    pub built: Vec<(String, PathBuf)>,
}

impl RecordingPackager {
    pub fn identifiers(&self) -> Vec<&str> {
        self.built.iter().map(|(id, _)| id.as_str()).collect()
    }
}

impl PackageBuilder for RecordingPackager {
    async fn build_package(
        &mut self,
        root: &Path,
        identifier: &str,
        _version: &str,
        output: &Path,
    ) -> Result<()> {
        assert!(root.is_dir());
        std::fs::write(output, identifier)?;
        self.built.push((identifier.to_string(), output.to_path_buf()));
        Ok(())
    }
}

/// Records image builds and writes a placeholder image.
#[derive(Debug, Default)]
pub struct RecordingImager {
    pub jobs: Vec<BuildJob>,
    pub profile_updates: usize,
}

impl ImageBuilder for RecordingImager {
    async fn update_profiles(&mut self) -> Result<()> {
        self.profile_updates += 1;
        Ok(())
    }

    async fn build(&mut self, job: &BuildJob) -> Result<()> {
        assert!(job.template.is_file());
        std::fs::write(&job.output, b"image")?;
        self.jobs.push(job.clone());
        Ok(())
    }
}

pub fn manifest(included: &[&str], managed: &[&str], optional: &[&str]) -> Vec<u8> {
    let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    let manifest = Manifest {
        included_manifests: to_vec(included),
        managed_installs: to_vec(managed),
        optional_installs: to_vec(optional),
    };
    let mut buf = Vec::new();
    plist::to_writer_xml(&mut buf, &manifest).unwrap();
    buf
}

pub fn catalog(items: &[CatalogItem]) -> Vec<u8> {
    let mut buf = Vec::new();
    plist::to_writer_xml(&mut buf, &items).unwrap();
    buf
}

/// Catalog item for a package whose content is `body`.
pub fn pkg_item(name: &str, version: &str, location: &str, body: &[u8]) -> CatalogItem {
    CatalogItem {
        name: name.to_string(),
        version: version.to_string(),
        installer_item_location: Some(location.to_string()),
        installer_item_hash: Some(bytes_sha256(body)),
        ..Default::default()
    }
}

pub fn nopkg_item(name: &str, version: &str) -> CatalogItem {
    CatalogItem {
        name: name.to_string(),
        version: version.to_string(),
        installer_type: Some("nopkg".to_string()),
        ..Default::default()
    }
}

pub fn manifest_url(name: &str) -> String {
    format!("{REPO}/manifests/{name}")
}

pub fn catalog_url(name: &str) -> String {
    format!("{REPO}/catalogs/{name}")
}

pub fn pkg_url(location: &str) -> String {
    format!("{REPO}/pkgs/{location}")
}

pub fn icon_url(name: &str) -> String {
    format!("{REPO}/icons/{name}")
}

/// The two-manifest repository: `prod` includes `base`; base installs pkgA,
/// prod installs pkgB and offers pkgC, which has an icon.
pub fn prod_repository() -> FakeFetcher {
    let mut fetcher = FakeFetcher::default();
    fetcher.serve(manifest_url("base"), manifest(&[], &["pkgA"], &[]));
    fetcher.serve(manifest_url("prod"), manifest(&["base"], &["pkgB"], &["pkgC"]));

    let mut pkg_c = pkg_item("pkgC", "1.0", "apps/pkgC-1.0.pkg", b"pkgC");
    pkg_c.icon_name = Some("pkgC.png".to_string());
    fetcher.serve(
        catalog_url("prod"),
        catalog(&[
            pkg_item("pkgA", "1.0", "apps/pkgA-1.0.pkg", b"pkgA"),
            pkg_item("pkgB", "2.0", "apps/pkgB-2.0.pkg", b"pkgB"),
            pkg_c,
        ]),
    );
    fetcher.serve(pkg_url("apps/pkgA-1.0.pkg"), b"pkgA".to_vec());
    fetcher.serve(pkg_url("apps/pkgB-2.0.pkg"), b"pkgB".to_vec());
    fetcher.serve(pkg_url("apps/pkgC-1.0.pkg"), b"pkgC".to_vec());
    fetcher.serve(icon_url("pkgC.png"), b"icon".to_vec());
    fetcher
}

pub fn repository(root: &Path, fetcher: FakeFetcher) -> Repository<FakeFetcher> {
    Repository::new(
        RepoUrls::new(REPO).unwrap(),
        CacheLayout::new(root),
        fetcher,
    )
}

pub fn files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

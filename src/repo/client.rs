//! Repository access with stale-cache fallback.
//!
//! Manifests and catalogs are fetched into the cache. When the server cannot
//! be reached but a cached copy exists, the cached copy is used with a warning;
//! with no cached copy the run cannot continue.

use crate::cache::layout::CacheLayout;
use crate::error::{Error, Result};
use crate::munki::catalog::{CatalogItem, CatalogSource, read_catalog};
use crate::munki::manifest::{Manifest, ManifestSource};
use crate::repo::fetch::{FetchOutcome, FetchRequest, Fetcher};
use crate::repo::urls::{RepoUrls, url_basename};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
enum Document {
    Manifest,
    Catalog,
}

impl Document {
    fn label(self) -> &'static str {
        match self {
            Document::Manifest => "manifest",
            Document::Catalog => "catalog",
        }
    }

    fn unavailable(self, name: &str, reason: String) -> Error {
        match self {
            Document::Manifest => Error::ManifestUnavailable {
                name: name.to_string(),
                reason,
            },
            Document::Catalog => Error::CatalogUnavailable {
                name: name.to_string(),
                reason,
            },
        }
    }
}

/// Munki repository seen through a [`Fetcher`] and the local cache.
pub struct Repository<F> {
    urls: RepoUrls,
    layout: CacheLayout,
    fetcher: F,
}

impl<F: Fetcher> Repository<F> {
    pub fn new(urls: RepoUrls, layout: CacheLayout, fetcher: F) -> Self {
        Self {
            urls,
            layout,
            fetcher,
        }
    }

    pub fn urls(&self) -> &RepoUrls {
        &self.urls
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    /// Fetch an artifact into `dest_dir`.
    pub async fn fetch(&mut self, request: FetchRequest<'_>) -> Result<FetchOutcome> {
        self.fetcher.fetch(request).await
    }

    /// Tell the fetcher a cached file was deleted.
    pub fn forget(&mut self, path: &Path) -> Result<()> {
        self.fetcher.forget(path)
    }

    async fn fetch_document(&mut self, kind: Document, name: &str) -> Result<PathBuf> {
        let (url, dir) = match kind {
            Document::Manifest => (self.urls.manifest(name), self.layout.manifests_dir()),
            Document::Catalog => (self.urls.catalog(name), self.layout.catalogs_dir()),
        };
        let cached = dir.join(url_basename(&url)?);

        match self.fetcher.fetch(FetchRequest::new(&url, &dir)).await {
            Ok(outcome) => {
                if !outcome.changed {
                    log::info!("No changes in {} {}, using cache.", kind.label(), name);
                }
                Ok(outcome.path)
            }
            Err(e) if cached.is_file() => {
                log::warn!(
                    "Could not retrieve {} {} from server: {}; using cached copy",
                    kind.label(),
                    name,
                    e
                );
                Ok(cached)
            }
            Err(e) => Err(kind.unavailable(name, e.to_string())),
        }
    }
}

impl<F: Fetcher> ManifestSource for Repository<F> {
    async fn manifest(&mut self, name: &str) -> Result<Manifest> {
        let path = self.fetch_document(Document::Manifest, name).await?;
        Manifest::from_path(&path)
    }
}

impl<F: Fetcher> CatalogSource for Repository<F> {
    async fn catalog(&mut self, name: &str) -> Result<Vec<CatalogItem>> {
        let path = self.fetch_document(Document::Catalog, name).await?;
        read_catalog(&path)
    }
}

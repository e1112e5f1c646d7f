//! Catalog indexing and item lookup.
//!
//! Each catalog is indexed by item name and version. A [`CatalogIndex`] holds
//! every catalog needed for one run and is passed by reference to whatever
//! resolves identifiers; nothing is cached globally.

use crate::error::Result;
use crate::munki::version::sort_newest_first;
use crate::repo::urls::RepoUrls;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One pkginfo entry of a catalog.
///
/// Only the fields this tool uses are read; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_item_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_item_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_hash: Option<String>,
}

/// Where an item's payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    /// `nopkg` items install nothing
    NoPkg,
    /// Package URL in the repository
    Package(String),
    /// Item has neither a payload nor the `nopkg` type
    Missing,
}

impl CatalogItem {
    pub fn is_nopkg(&self) -> bool {
        self.installer_type.as_deref() == Some("nopkg")
    }

    /// Download location of the installer item.
    pub fn source(&self, urls: &RepoUrls) -> ItemSource {
        if self.is_nopkg() {
            return ItemSource::NoPkg;
        }
        match &self.installer_item_location {
            Some(location) => ItemSource::Package(urls.pkg(location)),
            None => ItemSource::Missing,
        }
    }

    /// Icon URL when the item declares an icon name or an icon hash.
    pub fn icon_url(&self, urls: &RepoUrls) -> Option<String> {
        if let Some(icon) = &self.icon_name {
            Some(urls.icon(icon))
        } else if self.icon_hash.is_some() {
            Some(urls.icon(&format!("{}.png", self.name)))
        } else {
            None
        }
    }

    /// Declared SHA-256 of the installer item.
    pub fn hash(&self) -> Option<&str> {
        self.installer_item_hash.as_deref()
    }
}

/// Read a catalog property list.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogItem>> {
    Ok(plist::from_file(path)?)
}

/// Version request for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionReq<'a> {
    Latest,
    Exact(&'a str),
}

/// Name and version index of one catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogDb {
    named: HashMap<String, HashMap<String, Vec<usize>>>,
    items: Vec<CatalogItem>,
}

impl CatalogDb {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        let mut named: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            if item.name.is_empty() {
                log::debug!("Skipping catalog entry {} without a name", index);
                continue;
            }
            named
                .entry(item.name.clone())
                .or_default()
                .entry(item.version.clone())
                .or_default()
                .push(index);
        }
        Self { named, items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Find `name` at `version`. With several items at the same name and
    /// version, the first in catalog order wins.
    pub fn find(&self, name: &str, version: VersionReq<'_>) -> Option<&CatalogItem> {
        let versions = self.named.get(name)?;
        let index = match version {
            VersionReq::Latest => {
                let mut keys: Vec<&String> = versions.keys().collect();
                sort_newest_first(&mut keys);
                keys.first().and_then(|k| versions.get(*k)).and_then(|v| v.first())
            }
            VersionReq::Exact(v) => versions.get(v).and_then(|v| v.first()),
        }?;
        self.items.get(*index)
    }
}

/// Something that can produce catalog contents by name.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    async fn catalog(&mut self, name: &str) -> Result<Vec<CatalogItem>>;
}

/// Every catalog used in a run, indexed and keyed by catalog name.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    catalogs: HashMap<String, CatalogDb>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and index `names`, each at most once.
    pub async fn build<S: CatalogSource>(source: &mut S, names: &[String]) -> Result<Self> {
        let mut index = Self::new();
        index.load(source, names).await?;
        Ok(index)
    }

    /// Load any of `names` not already indexed.
    pub async fn load<S: CatalogSource>(&mut self, source: &mut S, names: &[String]) -> Result<()> {
        for name in names {
            if self.catalogs.contains_key(name) {
                continue;
            }
            log::info!("Considering catalog {}", name);
            let items = source.catalog(name).await?;
            log::debug!("Catalog {} has {} items", name, items.len());
            self.insert(name, items);
        }
        Ok(())
    }

    pub fn insert(&mut self, name: &str, items: Vec<CatalogItem>) {
        self.catalogs.insert(name.to_string(), CatalogDb::new(items));
    }

    pub fn catalog(&self, name: &str) -> Option<&CatalogDb> {
        self.catalogs.get(name)
    }

    /// Look `name` up in `catalogs`, in order; the first catalog holding the
    /// name decides, even if it lacks the requested version.
    pub fn lookup(
        &self,
        name: &str,
        catalogs: &[String],
        version: VersionReq<'_>,
    ) -> Option<&CatalogItem> {
        for catalog_name in catalogs {
            let Some(db) = self.catalogs.get(catalog_name) else {
                log::warn!("Non existent catalog {}", catalog_name);
                continue;
            };
            if db.contains(name) {
                return db.find(name, version);
            }
        }
        None
    }

    /// Resolve a manifest identifier.
    ///
    /// The identifier is tried verbatim at the latest version first, then as
    /// `name--version` or `name-version` with that exact version.
    pub fn resolve(&self, identifier: &str, catalogs: &[String]) -> Option<&CatalogItem> {
        self.lookup(identifier, catalogs, VersionReq::Latest)
            .or_else(|| {
                let (name, version) = split_name_version(identifier)?;
                self.lookup(name, catalogs, VersionReq::Exact(version))
            })
    }
}

/// Split `Name--1.2` or `Name-1.2` into name and version.
///
/// The version must start with a digit; otherwise there is no split.
pub fn split_name_version(identifier: &str) -> Option<(&str, &str)> {
    ["--", "-"].into_iter().find_map(|delim| {
        let (name, version) = identifier.rsplit_once(delim)?;
        let starts_numeric = version.starts_with(|c: char| c.is_ascii_digit());
        (starts_numeric && !name.is_empty()).then_some((name, version))
    })
}

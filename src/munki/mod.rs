//! Munki data model: manifests, catalogs, and loose version ordering.

pub mod catalog;
pub mod manifest;
pub mod version;

pub use catalog::{CatalogIndex, CatalogItem, ItemSource, VersionReq};
pub use manifest::{Manifest, ManifestTree};
pub use version::compare_versions;

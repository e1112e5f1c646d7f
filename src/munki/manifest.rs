//! Manifest loading and install resolution.
//!
//! A manifest lists `managed_installs`, `optional_installs`, and other
//! manifests to include. [`ManifestTree::load`] walks the include graph once,
//! fetching every distinct manifest a single time; resolution then runs over
//! the loaded tree without further I/O.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Munki manifest. Missing keys read as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub included_manifests: Vec<String>,
    #[serde(default)]
    pub managed_installs: Vec<String>,
    #[serde(default)]
    pub optional_installs: Vec<String>,
}

impl Manifest {
    /// Read a manifest property list.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(plist::from_file(path)?)
    }
}

/// Something that can produce manifests by name.
#[allow(async_fn_in_trait)]
pub trait ManifestSource {
    async fn manifest(&mut self, name: &str) -> Result<Manifest>;
}

/// A root manifest together with every manifest it transitively includes.
#[derive(Debug, Clone)]
pub struct ManifestTree {
    root: String,
    manifests: HashMap<String, Manifest>,
}

impl ManifestTree {
    /// Load `root` and all manifests reachable through `included_manifests`.
    ///
    /// Each name is requested once, even when the include graph has cycles or
    /// diamonds. A failure to produce any manifest aborts the load.
    pub async fn load<S: ManifestSource>(source: &mut S, root: &str) -> Result<Self> {
        let mut manifests = HashMap::new();
        let mut pending = vec![root.to_string()];

        while let Some(name) = pending.pop() {
            if manifests.contains_key(&name) {
                continue;
            }
            log::info!("Considering manifest {}", name);
            let manifest = source.manifest(&name).await?;
            // reversed so includes load in declaration order
            for include in manifest.included_manifests.iter().rev() {
                if !manifests.contains_key(include) {
                    log::info!("Found included manifest: {}", include);
                    pending.push(include.clone());
                }
            }
            manifests.insert(name, manifest);
        }

        Ok(Self {
            root: root.to_string(),
            manifests,
        })
    }

    /// Build a tree from manifests already in memory.
    pub fn from_manifests(root: &str, manifests: HashMap<String, Manifest>) -> Self {
        Self {
            root: root.to_string(),
            manifests,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Manifest> {
        self.manifests.get(name)
    }

    /// Managed installs of the root manifest, includes expanded first.
    pub fn resolve_installs(&self) -> Vec<String> {
        self.installs_of(&self.root)
    }

    /// Managed installs of `name`, depth-first and pre-order.
    ///
    /// Included manifests are fully expanded, in order, before the manifest's
    /// own entries. Duplicates are kept: a manifest reached along two paths
    /// contributes twice. A manifest already on the current inclusion path is
    /// a cycle and is skipped with a warning.
    pub fn installs_of(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visiting = HashSet::new();
        self.collect_installs(name, &mut visiting, &mut out);
        out
    }

    fn collect_installs<'a>(
        &'a self,
        name: &'a str,
        visiting: &mut HashSet<&'a str>,
        out: &mut Vec<String>,
    ) {
        if visiting.contains(name) {
            log::warn!("Manifest {} includes itself, skipping the cycle", name);
            return;
        }
        let Some(manifest) = self.manifests.get(name) else {
            log::warn!("Manifest {} was not loaded, skipping", name);
            return;
        };

        visiting.insert(name);
        for include in &manifest.included_manifests {
            self.collect_installs(include, visiting, out);
        }
        out.extend(manifest.managed_installs.iter().cloned());
        visiting.remove(name);
    }

    /// Optional installs of the root manifest only; includes are not consulted.
    pub fn resolve_optionals(&self) -> Vec<String> {
        self.manifests
            .get(&self.root)
            .map(|m| m.optional_installs.clone())
            .unwrap_or_default()
    }
}

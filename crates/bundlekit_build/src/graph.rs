//! Dependency graph builder.
//!
//! Expands the collector's explicit assets into the full asset universe:
//!
//! 1. Index every collected asset by path. The same path collected into two
//!    different bundles is a configuration error.
//! 2. Prune assets from dependency-only collectors that no primary asset
//!    depends on.
//! 3. Walk every surviving asset's dependency list, creating a pure-dependency
//!    node for each path not seen yet, and record the referencing bundle and
//!    tags on every dependency.
//! 4. Resolve each explicit asset's dependency paths to node ids and set them,
//!    exactly once.
//!
//! Dependency lists from the collector are already flattened, so no step
//! traverses the graph. Cycles only mean two nodes list each other.

use crate::error::{Error, Result};
use crate::parameters::BuildParameters;
use bundlekit_core::{CollectedAsset, CollectorKind};
use std::collections::{BTreeMap, BTreeSet};

/// Index of a node in an [`AssetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(usize);

impl AssetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One unique asset path of the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAsset {
    pub path: String,

    /// Declared bundle for explicit assets. Empty for pure dependencies until
    /// the assignment engine decides.
    pub bundle_name: String,

    pub address: String,
    pub tags: Vec<String>,

    /// Tags inherited from every asset that references this one.
    pub bundle_tags: Vec<String>,

    pub is_raw: bool,

    /// Pooled into the package's system bundle when not explicitly collected.
    pub is_system_asset: bool,

    /// `None` for pure dependencies discovered through another asset.
    pub collector_kind: Option<CollectorKind>,

    /// Bundles of the explicit assets that depend on this one.
    pub referencing_bundles: BTreeSet<String>,

    dependencies: Option<Vec<AssetId>>,
}

impl BuildAsset {
    fn explicit(collected: &CollectedAsset, is_system_asset: bool) -> Self {
        Self {
            path: collected.path.clone(),
            bundle_name: collected.bundle_name.clone(),
            address: collected.address.clone(),
            tags: collected.tags.clone(),
            bundle_tags: Vec::new(),
            is_raw: collected.is_raw,
            is_system_asset,
            collector_kind: Some(collected.collector_kind),
            referencing_bundles: BTreeSet::new(),
            dependencies: None,
        }
    }

    /// A node discovered as a dependency of an explicit asset.
    pub fn dependency(path: impl Into<String>, is_system_asset: bool) -> Self {
        Self {
            path: path.into(),
            bundle_name: String::new(),
            address: String::new(),
            tags: Vec::new(),
            bundle_tags: Vec::new(),
            is_raw: false,
            is_system_asset,
            collector_kind: None,
            referencing_bundles: BTreeSet::new(),
            dependencies: None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.collector_kind.is_some()
    }

    pub fn has_bundle(&self) -> bool {
        !self.bundle_name.is_empty()
    }

    /// Attach the flattened dependency list. Fails if it was already attached.
    pub fn set_dependencies(&mut self, dependencies: Vec<AssetId>) -> Result<()> {
        if self.dependencies.is_some() {
            return Err(Error::DependenciesAlreadySet(self.path.clone()));
        }
        self.dependencies = Some(dependencies);
        Ok(())
    }

    /// Every asset this one depends on, directly or transitively.
    /// Empty for pure dependencies.
    pub fn dependencies(&self) -> &[AssetId] {
        self.dependencies.as_deref().unwrap_or_default()
    }

    fn add_bundle_tags(&mut self, tags: &[String]) {
        for tag in tags {
            if !self.bundle_tags.contains(tag) {
                self.bundle_tags.push(tag.clone());
            }
        }
    }
}

/// Options of the graph builder, usually taken from [`BuildParameters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    /// Collector kinds whose assets survive only if a primary asset depends on them.
    pub dependency_only_kinds: Vec<CollectorKind>,
    /// Lowercase extensions of system assets.
    pub system_asset_extensions: Vec<String>,
    /// Require unique addresses among main assets.
    pub enable_addressable: bool,
}

impl GraphOptions {
    pub fn from_parameters(parameters: &BuildParameters) -> Self {
        Self {
            dependency_only_kinds: parameters.dependency_only_kinds.clone(),
            system_asset_extensions: parameters.system_asset_extensions.clone(),
            enable_addressable: parameters.enable_addressable,
        }
    }

    fn is_primary(&self, kind: CollectorKind) -> bool {
        !self.dependency_only_kinds.contains(&kind)
    }

    fn is_system_asset(&self, path: &str) -> bool {
        let ext = bundlekit_core::naming::extension_of(path);
        !ext.is_empty() && self.system_asset_extensions.contains(&ext)
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            dependency_only_kinds: vec![CollectorKind::DependAssetCollector],
            system_asset_extensions: vec!["shader".to_string(), "shadervariants".to_string()],
            enable_addressable: false,
        }
    }
}

/// The expanded asset universe of one package build.
///
/// Nodes live in an arena and refer to each other by [`AssetId`]. Every path
/// appears exactly once.
#[derive(Debug, Clone, Default)]
pub struct AssetGraph {
    assets: Vec<BuildAsset>,
    by_path: BTreeMap<String, AssetId>,
    pruned: Vec<String>,
}

impl AssetGraph {
    /// Build the graph from the collector output.
    pub fn build(collected: &[CollectedAsset], options: &GraphOptions) -> Result<Self> {
        let explicit = index_collected(collected)?;

        if options.enable_addressable {
            check_unique_addresses(explicit.values().copied())?;
        }

        // Everything a primary asset needs survives, whatever collector found it.
        let needed: BTreeSet<&str> = explicit
            .values()
            .filter(|asset| options.is_primary(asset.collector_kind))
            .flat_map(|asset| asset.direct_dependency_paths.iter().map(String::as_str))
            .collect();

        let mut graph = AssetGraph::default();
        let mut surviving: Vec<&CollectedAsset> = Vec::with_capacity(explicit.len());

        for (path, asset) in &explicit {
            if !options.is_primary(asset.collector_kind) && !needed.contains(path) {
                tracing::debug!(
                    "Pruned unreferenced asset path={} collector={}",
                    path,
                    asset.collector_kind
                );
                graph.pruned.push(path.to_string());
                continue;
            }
            graph.insert(BuildAsset::explicit(asset, options.is_system_asset(path)));
            surviving.push(*asset);
        }

        // Discover dependencies and record who references them.
        for asset in &surviving {
            for dep_path in unique_dependencies(asset) {
                let id = match graph.id_of(dep_path) {
                    Some(id) => id,
                    None => graph.insert(BuildAsset::dependency(
                        dep_path,
                        options.is_system_asset(dep_path),
                    )),
                };
                let dep = &mut graph.assets[id.0];
                dep.referencing_bundles.insert(asset.bundle_name.clone());
                dep.add_bundle_tags(&asset.tags);
            }
        }

        // Wire dependency lists.
        for asset in &surviving {
            let dependencies = unique_dependencies(asset)
                .map(|dep_path| {
                    graph
                        .id_of(dep_path)
                        .ok_or_else(|| Error::AssetNotFound(dep_path.to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            let id = graph
                .id_of(&asset.path)
                .ok_or_else(|| Error::AssetNotFound(asset.path.clone()))?;
            graph.assets[id.0].set_dependencies(dependencies)?;
        }

        tracing::info!(
            "Dependency graph explicit={} dependencies={} pruned={}",
            surviving.len(),
            graph.len() - surviving.len(),
            graph.pruned.len()
        );

        Ok(graph)
    }

    fn insert(&mut self, asset: BuildAsset) -> AssetId {
        let id = AssetId(self.assets.len());
        self.by_path.insert(asset.path.clone(), id);
        self.assets.push(asset);
        id
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn id_of(&self, path: &str) -> Option<AssetId> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, id: AssetId) -> &BuildAsset {
        &self.assets[id.0]
    }

    pub fn get_mut(&mut self, id: AssetId) -> &mut BuildAsset {
        &mut self.assets[id.0]
    }

    pub fn by_path(&self, path: &str) -> Option<&BuildAsset> {
        self.id_of(path).map(|id| self.get(id))
    }

    /// Node ids in path order.
    pub fn ids(&self) -> Vec<AssetId> {
        self.by_path.values().copied().collect()
    }

    /// Nodes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &BuildAsset)> {
        self.by_path
            .values()
            .map(move |&id| (id, &self.assets[id.0]))
    }

    /// Paths of explicit assets dropped because nothing depends on them.
    pub fn pruned(&self) -> &[String] {
        &self.pruned
    }

    /// Dependency paths of a node, in collector order.
    pub fn dependency_paths(&self, id: AssetId) -> impl Iterator<Item = &str> {
        self.get(id)
            .dependencies()
            .iter()
            .map(move |&dep| self.get(dep).path.as_str())
    }
}

/// Dependency paths of a collected asset, without itself and without repeats.
fn unique_dependencies(asset: &CollectedAsset) -> impl Iterator<Item = &str> {
    let mut seen = BTreeSet::new();
    asset
        .direct_dependency_paths
        .iter()
        .map(String::as_str)
        .filter(move |dep| *dep != asset.path && seen.insert(*dep))
}

fn index_collected(collected: &[CollectedAsset]) -> Result<BTreeMap<&str, &CollectedAsset>> {
    let mut explicit: BTreeMap<&str, &CollectedAsset> = BTreeMap::new();
    for asset in collected {
        if asset.bundle_name.trim().is_empty() {
            return Err(Error::MissingBundleName(asset.path.clone()));
        }
        if let Some(existing) = explicit.get(asset.path.as_str()) {
            if existing.bundle_name != asset.bundle_name {
                return Err(Error::BundleCollision {
                    path: asset.path.clone(),
                    first: existing.bundle_name.clone(),
                    second: asset.bundle_name.clone(),
                });
            }
            tracing::warn!("Asset collected twice into the same bundle path={}", asset.path);
            continue;
        }
        explicit.insert(asset.path.as_str(), asset);
    }
    Ok(explicit)
}

fn check_unique_addresses<'a>(assets: impl Iterator<Item = &'a CollectedAsset>) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for asset in assets.filter(|a| a.collector_kind.is_addressable() && !a.address.is_empty()) {
        if let Some(first) = seen.insert(asset.address.as_str(), asset.path.as_str()) {
            return Err(Error::DuplicateAddress {
                address: asset.address.clone(),
                first: first.to_string(),
                second: asset.path.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collected(path: &str, bundle: &str, deps: &[&str]) -> CollectedAsset {
        CollectedAsset::new(path, bundle).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_expands_dependencies() {
        let assets = vec![
            collected("a.prefab", "a.bundle", &["b.mat", "c.png"]).with_tags(["ui"]),
            collected("d.prefab", "d.bundle", &[]),
        ];
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();

        assert_eq!(graph.len(), 4);
        let b = graph.by_path("b.mat").unwrap();
        assert!(!b.is_explicit());
        assert!(!b.has_bundle());
        assert_eq!(
            b.referencing_bundles.iter().collect::<Vec<_>>(),
            vec!["a.bundle"]
        );
        assert_eq!(b.bundle_tags, vec!["ui".to_string()]);

        let a = graph.id_of("a.prefab").unwrap();
        assert_eq!(
            graph.dependency_paths(a).collect::<Vec<_>>(),
            vec!["b.mat", "c.png"]
        );
        assert!(graph.by_path("d.prefab").unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_shared_dependency_records_every_bundle() {
        let assets = vec![
            collected("x.prefab", "x.bundle", &["e.png"]),
            collected("y.prefab", "y.bundle", &["e.png"]),
        ];
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();
        let e = graph.by_path("e.png").unwrap();
        assert_eq!(e.referencing_bundles.len(), 2);
    }

    #[test]
    fn test_cycles_are_tolerated() {
        let assets = vec![
            collected("a.prefab", "a.bundle", &["b.prefab"]),
            collected("b.prefab", "b.bundle", &["a.prefab", "b.prefab"]),
        ];
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();

        let a = graph.id_of("a.prefab").unwrap();
        let b = graph.id_of("b.prefab").unwrap();
        assert_eq!(graph.get(a).dependencies(), &[b]);
        assert_eq!(graph.get(b).dependencies(), &[a]);
    }

    #[test]
    fn test_collected_asset_needs_bundle_name() {
        let assets = vec![
            collected("A.prefab", "a.bundle", &[]),
            collected("B.prefab", "", &[]),
        ];
        assert!(matches!(
            AssetGraph::build(&assets, &GraphOptions::default()),
            Err(Error::MissingBundleName(path)) if path == "B.prefab"
        ));
    }

    #[test]
    fn test_dependencies_set_once() {
        let mut asset = BuildAsset::dependency("a.png", false);
        asset.set_dependencies(vec![]).unwrap();
        assert!(matches!(
            asset.set_dependencies(vec![]),
            Err(Error::DependenciesAlreadySet(path)) if path == "a.png"
        ));
    }

    #[test]
    fn test_prunes_unreferenced_dependency_collector_assets() {
        let assets = vec![
            collected("main.prefab", "main.bundle", &["used.mat"]),
            collected("used.mat", "deps.bundle", &[])
                .with_collector_kind(CollectorKind::DependAssetCollector),
            collected("orphan.mat", "deps.bundle", &["orphan.png"])
                .with_collector_kind(CollectorKind::DependAssetCollector),
        ];
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();

        assert_eq!(graph.pruned(), &["orphan.mat".to_string()]);
        assert!(graph.by_path("orphan.mat").is_none());
        assert!(graph.by_path("orphan.png").is_none());
        assert!(graph.by_path("used.mat").unwrap().is_explicit());
    }

    #[test]
    fn test_pruning_policy_is_configurable() {
        let assets = vec![collected("static.png", "static.bundle", &[])
            .with_collector_kind(CollectorKind::StaticAssetCollector)];

        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();
        assert!(graph.pruned().is_empty());

        let options = GraphOptions {
            dependency_only_kinds: vec![CollectorKind::StaticAssetCollector],
            ..GraphOptions::default()
        };
        let graph = AssetGraph::build(&assets, &options).unwrap();
        assert_eq!(graph.pruned().len(), 1);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_bundle_collision() {
        let assets = vec![
            collected("a.png", "x.bundle", &[]),
            collected("a.png", "y.bundle", &[]),
        ];
        assert!(matches!(
            AssetGraph::build(&assets, &GraphOptions::default()),
            Err(Error::BundleCollision { .. })
        ));
    }

    #[test]
    fn test_duplicate_address() {
        let assets = vec![
            collected("a/icon.png", "a.bundle", &[]).with_address("icon"),
            collected("b/icon.png", "b.bundle", &[]).with_address("icon"),
        ];
        let options = GraphOptions {
            enable_addressable: true,
            ..GraphOptions::default()
        };
        assert!(matches!(
            AssetGraph::build(&assets, &options),
            Err(Error::DuplicateAddress { .. })
        ));
        assert!(AssetGraph::build(&assets, &GraphOptions::default()).is_ok());
    }

    #[test]
    fn test_system_assets_flagged() {
        let assets = vec![collected("a.mat", "a.bundle", &["lit.shader"])];
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();
        assert!(graph.by_path("lit.shader").unwrap().is_system_asset);
        assert!(!graph.by_path("a.mat").unwrap().is_system_asset);
    }
}

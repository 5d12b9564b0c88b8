//! Bundle assignment engine.
//!
//! Decides the final bundle of every node in the [`AssetGraph`]:
//!
//! - explicit assets keep their declared bundle;
//! - system assets go to the package's system bundle;
//! - dependencies referenced by more than one bundle go to a synthesized
//!   shared bundle named after their path;
//! - dependencies referenced by a single bundle get no bundle and are folded
//!   into their referencing bundle by the packager.
//!
//! Nodes with a bundle are then grouped into [`BundleAssignment`]s, sorted by
//! bundle name, and the raw-file rules are checked.

use crate::context::{ContextKind, ContextObject};
use crate::error::{Error, Result};
use crate::graph::{AssetGraph, AssetId, BuildAsset, GraphOptions};
use crate::parameters::BuildParameters;
use bundlekit_core::hash::{FileDigest, ZERO_HASH};
use bundlekit_core::naming::{self, BUNDLE_EXTENSION};
use bundlekit_core::CollectResult;
use bundlekit_manifest::LoadMethod;
use camino::Utf8PathBuf;
use std::collections::BTreeMap;

/// One bundle of the build and everything later tasks learn about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAssignment {
    pub bundle_name: String,

    /// Member nodes, in path order. No node appears twice.
    pub members: Vec<AssetId>,

    /// Set when the bundle holds a raw file.
    pub is_raw: bool,

    /// Extension of the output file: the bundle extension, or the raw file's own.
    pub extension: String,

    /// Union of member tags and tags inherited from referencing assets.
    pub tags: Vec<String>,

    /// Identifies the logical contents. Filled by the bundle info task.
    pub content_hash: String,
    pub file_hash: String,
    pub crc: u32,
    pub size: u64,

    /// Encrypted copy of the bundle, if the encryption service produced one.
    pub encrypted_path: Option<Utf8PathBuf>,
    pub load_method: LoadMethod,

    /// File name inside the package directory. Known only after hashing.
    pub output_file_name: String,
}

impl BundleAssignment {
    fn new(bundle_name: String) -> Self {
        Self {
            bundle_name,
            members: Vec::new(),
            is_raw: false,
            extension: BUNDLE_EXTENSION.to_string(),
            tags: Vec::new(),
            content_hash: ZERO_HASH.to_string(),
            file_hash: ZERO_HASH.to_string(),
            crc: 0,
            size: 0,
            encrypted_path: None,
            load_method: LoadMethod::Normal,
            output_file_name: String::new(),
        }
    }

    /// Record the digest of the bundle file.
    pub fn apply_digest(&mut self, content_hash: String, digest: FileDigest) {
        self.content_hash = content_hash;
        self.file_hash = digest.md5;
        self.crc = digest.crc;
        self.size = digest.size;
    }

    pub fn has_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }
}

/// Options of the assignment engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOptions {
    pub package_name: String,
    pub unique_bundle_name: bool,
}

impl AssignOptions {
    pub fn from_parameters(parameters: &BuildParameters) -> Self {
        Self {
            package_name: parameters.package_name.clone(),
            unique_bundle_name: parameters.unique_bundle_name,
        }
    }
}

/// The authoritative bundle layout of one build.
#[derive(Debug, Clone)]
pub struct BuildMap {
    pub graph: AssetGraph,

    /// Bundles sorted by name.
    pub bundles: Vec<BundleAssignment>,

    pub system_bundle_name: String,
    pub enable_addressable: bool,
    pub unique_bundle_name: bool,

    /// Number of nodes placed in a bundle.
    pub total_asset_count: usize,

    /// Number of dependencies folded into their single referencing bundle.
    pub folded_asset_count: usize,
}

impl BuildMap {
    /// Expand the collector output and assign every asset.
    pub fn create(collected: &CollectResult, parameters: &BuildParameters) -> Result<Self> {
        let graph = AssetGraph::build(&collected.assets, &GraphOptions::from_parameters(parameters))?;
        let mut map = Self::assign(
            graph,
            &collected.system_bundle_name,
            &AssignOptions::from_parameters(parameters),
        )?;
        map.enable_addressable = parameters.enable_addressable;
        Ok(map)
    }

    /// Assign bundles to the nodes of a wired graph.
    pub fn assign(
        mut graph: AssetGraph,
        system_bundle_name: &str,
        options: &AssignOptions,
    ) -> Result<Self> {
        let mut folded = 0usize;
        let mut shared = 0usize;

        for id in graph.ids() {
            let asset = graph.get_mut(id);
            if asset.has_bundle() {
                continue;
            }

            if asset.is_system_asset {
                asset.bundle_name = system_bundle_name.to_string();
            } else if asset.referencing_bundles.len() > 1 {
                if asset.is_raw {
                    return Err(Error::RawAssetShared(asset.path.clone()));
                }
                asset.bundle_name = naming::share_bundle_name(
                    &options.package_name,
                    &asset.path,
                    options.unique_bundle_name,
                );
                shared += 1;
                tracing::debug!(
                    "Shared bundle asset={} bundle={} referenced_by={}",
                    asset.path,
                    asset.bundle_name,
                    asset.referencing_bundles.len()
                );
            } else {
                folded += 1;
            }
        }

        check_raw_dependencies(&graph)?;

        let mut grouped: BTreeMap<String, BundleAssignment> = BTreeMap::new();
        for (id, asset) in graph.iter().filter(|(_, asset)| asset.has_bundle()) {
            let bundle = grouped
                .entry(asset.bundle_name.clone())
                .or_insert_with(|| BundleAssignment::new(asset.bundle_name.clone()));
            bundle.members.push(id);
            bundle.is_raw |= asset.is_raw;
            for tag in asset.tags.iter().chain(&asset.bundle_tags) {
                if !bundle.tags.contains(tag) {
                    bundle.tags.push(tag.clone());
                }
            }
        }

        let mut bundles: Vec<BundleAssignment> = grouped.into_values().collect();
        for bundle in &mut bundles {
            if bundle.is_raw {
                if bundle.members.len() != 1 {
                    return Err(Error::RawBundleMemberCount {
                        bundle: bundle.bundle_name.clone(),
                        count: bundle.members.len(),
                    });
                }
                bundle.extension = naming::extension_of(&graph.get(bundle.members[0]).path);
            }
        }

        let total_asset_count = bundles.iter().map(|b| b.members.len()).sum();

        tracing::info!(
            "Bundle assignment bundles={} assets={} shared={} folded={}",
            bundles.len(),
            total_asset_count,
            shared,
            folded
        );

        Ok(Self {
            graph,
            bundles,
            system_bundle_name: system_bundle_name.to_string(),
            enable_addressable: false,
            unique_bundle_name: options.unique_bundle_name,
            total_asset_count,
            folded_asset_count: folded,
        })
    }

    pub fn bundle(&self, bundle_name: &str) -> Option<&BundleAssignment> {
        self.bundle_index(bundle_name).map(|index| &self.bundles[index])
    }

    pub fn bundle_mut(&mut self, bundle_name: &str) -> Option<&mut BundleAssignment> {
        self.bundle_index(bundle_name)
            .map(move |index| &mut self.bundles[index])
    }

    /// Position of a bundle in [`BuildMap::bundles`].
    pub fn bundle_index(&self, bundle_name: &str) -> Option<usize> {
        self.bundles
            .binary_search_by(|bundle| bundle.bundle_name.as_str().cmp(bundle_name))
            .ok()
    }

    pub fn members<'a>(
        &'a self,
        bundle: &'a BundleAssignment,
    ) -> impl Iterator<Item = &'a BuildAsset> + 'a {
        bundle.members.iter().map(move |&id| self.graph.get(id))
    }

    /// Flattened dependency paths of every explicit asset that has any.
    pub fn explicit_dependencies(&self) -> BTreeMap<String, Vec<String>> {
        self.graph
            .iter()
            .filter(|(_, asset)| asset.is_explicit() && !asset.dependencies().is_empty())
            .map(|(id, asset)| {
                let deps = self
                    .graph
                    .dependency_paths(id)
                    .map(str::to_string)
                    .collect();
                (asset.path.clone(), deps)
            })
            .collect()
    }

    /// Bundles of the given member's dependencies, excluding `own_bundle`.
    pub fn dependency_bundles(&self, id: AssetId, own_bundle: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for &dep in self.graph.get(id).dependencies() {
            let name = self.graph.get(dep).bundle_name.as_str();
            if !name.is_empty() && name != own_bundle && !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

impl ContextObject for BuildMap {
    const KIND: ContextKind = ContextKind::BuildMap;
}

/// Raw files cannot be depended upon.
fn check_raw_dependencies(graph: &AssetGraph) -> Result<()> {
    for (_, asset) in graph.iter().filter(|(_, asset)| asset.is_explicit()) {
        for &dep in asset.dependencies() {
            let dependency = graph.get(dep);
            if dependency.is_raw {
                return Err(Error::RawAssetDepended {
                    asset: asset.path.clone(),
                    dependency: dependency.path.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlekit_core::CollectedAsset;

    const SYSTEM: &str = "pkg_systemshaders.bundle";

    fn options() -> AssignOptions {
        AssignOptions {
            package_name: "pkg".to_string(),
            unique_bundle_name: false,
        }
    }

    fn build(assets: Vec<CollectedAsset>) -> Result<BuildMap> {
        let graph = AssetGraph::build(&assets, &GraphOptions::default())?;
        BuildMap::assign(graph, SYSTEM, &options())
    }

    fn member_paths<'a>(map: &'a BuildMap, bundle: &str) -> Vec<&'a str> {
        let bundle = map.bundle(bundle).unwrap();
        map.members(bundle).map(|a| a.path.as_str()).collect()
    }

    #[test]
    fn test_single_reference_dependencies_are_folded() {
        let map = build(vec![
            CollectedAsset::new("A.prefab", "a.bundle").with_dependencies(["B.mat", "C.png"]),
            CollectedAsset::new("D.prefab", "d.bundle"),
        ])
        .unwrap();

        let names: Vec<_> = map.bundles.iter().map(|b| b.bundle_name.as_str()).collect();
        assert_eq!(names, vec!["a.bundle", "d.bundle"]);
        assert_eq!(member_paths(&map, "a.bundle"), vec!["A.prefab"]);
        assert_eq!(map.folded_asset_count, 2);
        assert_eq!(map.total_asset_count, map.graph.len() - map.folded_asset_count);
    }

    #[test]
    fn test_multi_reference_dependency_is_shared() {
        let map = build(vec![
            CollectedAsset::new("X.prefab", "x.bundle").with_dependencies(["Shared/E.png"]),
            CollectedAsset::new("Y.prefab", "y.bundle").with_dependencies(["Shared/E.png"]),
        ])
        .unwrap();

        assert_eq!(member_paths(&map, "share_shared_e.bundle"), vec!["Shared/E.png"]);
        let x = map.graph.id_of("X.prefab").unwrap();
        assert_eq!(
            map.dependency_bundles(x, "x.bundle"),
            vec!["share_shared_e.bundle"]
        );
    }

    #[test]
    fn test_unique_shared_bundle_name() {
        let graph = AssetGraph::build(
            &[
                CollectedAsset::new("X.prefab", "x.bundle").with_dependencies(["E.png"]),
                CollectedAsset::new("Y.prefab", "y.bundle").with_dependencies(["E.png"]),
            ],
            &GraphOptions::default(),
        )
        .unwrap();
        let options = AssignOptions {
            package_name: "pkg".to_string(),
            unique_bundle_name: true,
        };
        let map = BuildMap::assign(graph, SYSTEM, &options).unwrap();
        assert!(map.bundle("pkg_share_e.bundle").is_some());
    }

    #[test]
    fn test_system_assets_pooled() {
        let map = build(vec![
            CollectedAsset::new("A.mat", "a.bundle").with_dependencies(["Lit.shader"]),
        ])
        .unwrap();
        assert_eq!(member_paths(&map, SYSTEM), vec!["Lit.shader"]);
        assert_eq!(map.folded_asset_count, 0);
    }

    #[test]
    fn test_raw_asset_depended_upon() {
        let result = build(vec![
            CollectedAsset::new("F.mp4", "f.rawfile").raw(),
            CollectedAsset::new("G.prefab", "g.bundle").with_dependencies(["F.mp4"]),
        ]);
        assert!(matches!(
            result,
            Err(Error::RawAssetDepended { asset, dependency })
                if asset == "G.prefab" && dependency == "F.mp4"
        ));
    }

    #[test]
    fn test_raw_bundle_member_count() {
        let result = build(vec![
            CollectedAsset::new("a.mp4", "videos.rawfile").raw(),
            CollectedAsset::new("b.mp4", "videos.rawfile").raw(),
        ]);
        assert!(matches!(
            result,
            Err(Error::RawBundleMemberCount { count: 2, .. })
        ));
    }

    #[test]
    fn test_raw_bundle_extension() {
        let map = build(vec![CollectedAsset::new("Intro.MP4", "intro.rawfile").raw()]).unwrap();
        let bundle = map.bundle("intro.rawfile").unwrap();
        assert!(bundle.is_raw);
        assert_eq!(bundle.extension, "mp4");
    }

    #[test]
    fn test_raw_asset_cannot_be_shared() {
        let mut graph = AssetGraph::build(
            &[
                CollectedAsset::new("X.prefab", "x.bundle").with_dependencies(["E.bin"]),
                CollectedAsset::new("Y.prefab", "y.bundle").with_dependencies(["E.bin"]),
            ],
            &GraphOptions::default(),
        )
        .unwrap();
        let id = graph.id_of("E.bin").unwrap();
        graph.get_mut(id).is_raw = true;

        assert!(matches!(
            BuildMap::assign(graph, SYSTEM, &options()),
            Err(Error::RawAssetShared(path)) if path == "E.bin"
        ));
    }

    #[test]
    fn test_bundle_tags_merge_member_and_inherited() {
        let map = build(vec![
            CollectedAsset::new("X.prefab", "x.bundle")
                .with_tags(["ui"])
                .with_dependencies(["E.png"]),
            CollectedAsset::new("Y.prefab", "y.bundle")
                .with_tags(["hud"])
                .with_dependencies(["E.png"]),
        ])
        .unwrap();
        assert_eq!(
            map.bundle("share_e.bundle").unwrap().tags,
            vec!["ui".to_string(), "hud".to_string()]
        );
    }

    #[test]
    fn test_explicit_dependencies() {
        let map = build(vec![
            CollectedAsset::new("A.prefab", "a.bundle").with_dependencies(["B.mat", "C.png"]),
            CollectedAsset::new("D.prefab", "d.bundle"),
        ])
        .unwrap();
        let deps = map.explicit_dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps["A.prefab"], vec!["B.mat".to_string(), "C.png".to_string()]);
    }
}

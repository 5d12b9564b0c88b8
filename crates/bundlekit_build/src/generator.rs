//! Manifest generation.
//!
//! Turns the [`BuildMap`] and the packager's direct-dependency table into a
//! [`PatchManifest`]:
//!
//! 1. Bundles are emitted in build map order, so a bundle's index is its
//!    position in [`BuildMap::bundles`].
//! 2. Every main asset gets the index of its bundle and the indices of the
//!    bundles owning its (already flattened) dependencies. Folded
//!    dependencies live inside the asset's own bundle and add nothing.
//! 3. A bundle's `reference_ids` lists the bundles whose packager-reported
//!    direct dependencies name it. The asset graph is not consulted here: the
//!    packager may merge object references the graph does not predict.
//! 4. The packager does not report the system bundle as a per-asset
//!    dependency. Any bundle depending on it has it injected into the
//!    dependency list of each of its assets.

use crate::assignment::BuildMap;
use crate::error::{Error, Result};
use crate::packager::PackagerReport;
use crate::parameters::BuildParameters;
use bundlekit_core::CollectorKind;
use bundlekit_manifest::{PatchAsset, PatchBundle, PatchManifest};
use std::collections::BTreeMap;

/// Build the manifest of one package.
pub fn create_manifest(
    map: &BuildMap,
    report: &dyn PackagerReport,
    parameters: &BuildParameters,
) -> Result<PatchManifest> {
    let mut manifest = PatchManifest::new(&parameters.package_name, &parameters.package_version)
        .with_addressable(map.enable_addressable)
        .with_output_name_style(parameters.output_name_style);

    manifest.bundle_list = map
        .bundles
        .iter()
        .map(|bundle| PatchBundle {
            bundle_name: bundle.bundle_name.clone(),
            file_hash: bundle.file_hash.clone(),
            file_crc: bundle.crc,
            file_size: bundle.size,
            is_raw_file: bundle.is_raw,
            load_method: bundle.load_method,
            tags: bundle.tags.clone(),
            reference_ids: Vec::new(),
        })
        .collect();

    let ids: BTreeMap<&str, u32> = map
        .bundles
        .iter()
        .enumerate()
        .map(|(index, bundle)| (bundle.bundle_name.as_str(), index as u32))
        .collect();
    let bundle_id = |name: &str| {
        ids.get(name)
            .copied()
            .ok_or_else(|| Error::BundleNotFound(name.to_string()))
    };

    for (_, asset) in map
        .graph
        .iter()
        .filter(|(_, asset)| asset.collector_kind == Some(CollectorKind::MainAssetCollector))
    {
        let own = bundle_id(&asset.bundle_name)?;
        let mut depend_ids: Vec<u32> = Vec::new();
        for &dep in asset.dependencies() {
            let dependency = map.graph.get(dep);
            if !dependency.has_bundle() {
                continue;
            }
            let id = bundle_id(&dependency.bundle_name)?;
            if id != own && !depend_ids.contains(&id) {
                depend_ids.push(id);
            }
        }

        manifest.asset_list.push(PatchAsset {
            address: if map.enable_addressable {
                asset.address.clone()
            } else {
                String::new()
            },
            asset_path: asset.path.clone(),
            asset_tags: asset.tags.clone(),
            bundle_id: own,
            depend_ids,
        });
    }

    // Query the packager once per bundle before the quadratic scan.
    let direct: Vec<&[String]> = map
        .bundles
        .iter()
        .map(|bundle| report.direct_dependencies(&bundle.bundle_name))
        .collect();

    for (index, bundle) in manifest.bundle_list.iter_mut().enumerate() {
        bundle.reference_ids = direct
            .iter()
            .enumerate()
            .filter(|&(other, deps)| other != index && deps.contains(&bundle.bundle_name))
            .map(|(other, _)| other as u32)
            .collect();
    }

    inject_system_bundle(&mut manifest, map, &direct);

    manifest.validate()?;

    tracing::info!(
        "Created manifest package={} version={} bundles={} assets={}",
        manifest.package_name,
        manifest.package_version,
        manifest.bundle_list.len(),
        manifest.asset_list.len()
    );

    Ok(manifest)
}

fn inject_system_bundle(manifest: &mut PatchManifest, map: &BuildMap, direct: &[&[String]]) {
    let Some(system_id) = manifest.bundle_id(&map.system_bundle_name) else {
        return;
    };

    let dependents: Vec<u32> = direct
        .iter()
        .enumerate()
        .filter(|(_, deps)| deps.contains(&map.system_bundle_name))
        .map(|(index, _)| index as u32)
        .collect();

    for asset in &mut manifest.asset_list {
        if asset.bundle_id != system_id
            && dependents.contains(&asset.bundle_id)
            && !asset.depend_ids.contains(&system_id)
        {
            tracing::trace!("Injected system bundle asset={}", asset.asset_path);
            asset.depend_ids.push(system_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignOptions;
    use crate::graph::{AssetGraph, GraphOptions};
    use crate::packager::{LegacyBuildOutput, SimulateReport};
    use bundlekit_core::CollectedAsset;

    const SYSTEM: &str = "pkg_systemshaders.bundle";

    fn build_map(assets: Vec<CollectedAsset>) -> BuildMap {
        let graph = AssetGraph::build(&assets, &GraphOptions::default()).unwrap();
        let options = AssignOptions {
            package_name: "pkg".to_string(),
            unique_bundle_name: false,
        };
        BuildMap::assign(graph, SYSTEM, &options).unwrap()
    }

    fn params() -> BuildParameters {
        BuildParameters::new("project", "build", "pkg", "v1")
    }

    fn report(deps: Vec<(&str, Vec<&str>)>) -> LegacyBuildOutput {
        let mut output = LegacyBuildOutput::default();
        for (bundle, list) in deps {
            output
                .bundle_hashes
                .insert(bundle.to_string(), "hash".to_string());
            output.dependencies.insert(
                bundle.to_string(),
                list.iter().map(|d| d.to_string()).collect(),
            );
        }
        output
    }

    #[test]
    fn test_shared_bundle_listed_as_dependency() {
        let map = build_map(vec![
            CollectedAsset::new("X.prefab", "x.bundle").with_dependencies(["E.png"]),
            CollectedAsset::new("Y.prefab", "y.bundle").with_dependencies(["E.png"]),
        ]);
        let report = report(vec![
            ("share_e.bundle", vec![]),
            ("x.bundle", vec!["share_e.bundle"]),
            ("y.bundle", vec!["share_e.bundle"]),
        ]);

        let manifest = create_manifest(&map, &report, &params()).unwrap();
        let shared = manifest.bundle_id("share_e.bundle").unwrap();

        assert_eq!(manifest.asset_list.len(), 2);
        for asset in &manifest.asset_list {
            assert_eq!(asset.depend_ids, vec![shared]);
        }
        assert_eq!(manifest.bundle_list[shared as usize].reference_ids, vec![1, 2]);
        assert!(manifest.bundle_list[1].reference_ids.is_empty());
    }

    #[test]
    fn test_folded_dependencies_add_nothing() {
        let map = build_map(vec![
            CollectedAsset::new("A.prefab", "a.bundle").with_dependencies(["B.mat", "C.png"]),
            CollectedAsset::new("D.prefab", "d.bundle"),
        ]);
        let manifest =
            create_manifest(&map, &SimulateReport::from_build_map(&map), &params()).unwrap();

        let names: Vec<_> = manifest
            .bundle_list
            .iter()
            .map(|b| b.bundle_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.bundle", "d.bundle"]);
        assert!(manifest.asset_list.iter().all(|a| a.depend_ids.is_empty()));
        assert!(manifest.find_asset("B.mat").is_none());
    }

    #[test]
    fn test_reference_ids_follow_packager_table() {
        let map = build_map(vec![
            CollectedAsset::new("A.prefab", "a.bundle"),
            CollectedAsset::new("B.prefab", "b.bundle"),
        ]);
        // The packager reports a dependency the asset graph does not know about,
        // plus a self edge that must not surface.
        let report = report(vec![("a.bundle", vec!["b.bundle", "a.bundle"]), ("b.bundle", vec![])]);

        let manifest = create_manifest(&map, &report, &params()).unwrap();
        assert_eq!(manifest.bundle_list[1].reference_ids, vec![0]);
        assert!(manifest.bundle_list[0].reference_ids.is_empty());
        assert!(manifest.asset_list[0].depend_ids.is_empty());
    }

    #[test]
    fn test_system_bundle_injected() {
        let map = build_map(vec![
            CollectedAsset::new("A.mat", "a.bundle").with_dependencies(["Lit.shader"]),
            CollectedAsset::new("B.prefab", "b.bundle"),
            CollectedAsset::new("C.prefab", "c.bundle"),
        ]);
        let system = 3;

        let report = report(vec![
            ("a.bundle", vec![SYSTEM]),
            ("b.bundle", vec![SYSTEM]),
            ("c.bundle", vec![]),
            (SYSTEM, vec![]),
        ]);
        let manifest = create_manifest(&map, &report, &params()).unwrap();
        assert_eq!(manifest.bundle_id(SYSTEM), Some(system));

        // Already present through the asset graph, not duplicated.
        assert_eq!(manifest.find_asset("A.mat").unwrap().depend_ids, vec![system]);
        // Only known from the packager table.
        assert_eq!(manifest.find_asset("B.prefab").unwrap().depend_ids, vec![system]);
        assert!(manifest.find_asset("C.prefab").unwrap().depend_ids.is_empty());
        assert_eq!(manifest.bundle_list[3].reference_ids, vec![0, 1]);
    }

    #[test]
    fn test_only_main_assets_listed() {
        let map = build_map(vec![
            CollectedAsset::new("A.prefab", "a.bundle").with_address("a"),
            CollectedAsset::new("S.png", "static.bundle")
                .with_collector_kind(CollectorKind::StaticAssetCollector),
        ]);
        let manifest =
            create_manifest(&map, &SimulateReport::from_build_map(&map), &params()).unwrap();

        assert_eq!(manifest.bundle_list.len(), 2);
        assert_eq!(manifest.asset_list.len(), 1);
        assert_eq!(manifest.asset_list[0].address, "");
        assert!(!manifest.enable_addressable);
    }

    #[test]
    fn test_addresses_when_addressable() {
        let mut map = build_map(vec![CollectedAsset::new("A.prefab", "a.bundle").with_address("a")]);
        map.enable_addressable = true;
        let manifest =
            create_manifest(&map, &SimulateReport::from_build_map(&map), &params()).unwrap();
        assert!(manifest.enable_addressable);
        assert_eq!(manifest.find_asset("a").unwrap().asset_path, "A.prefab");
    }
}

//! Filesystem-backed package collector.
//!
//! [`PackageCollector`] turns a [`CollectorSettings`] package into the list of
//! [`CollectedAsset`]s the build pipeline consumes:
//!
//! 1. Skip groups whose active rule rejects them.
//! 2. For every collector entry, enumerate its collect path (a single file, or
//!    every valid file below a directory that passes the filter rule).
//! 3. Resolve bundle name (pack rule), address (address rule, main assets in
//!    addressable mode only), tags (group + collector) and dependencies.
//! 4. Merge duplicates across collectors, rejecting bundle-name collisions.
//! 5. Reject duplicate addresses.

use crate::rules::{RuleData, RuleRegistry};
use crate::settings::{split_tags, CollectorEntry, CollectorSettings, GroupSettings};
use bundlekit_core::naming;
use bundlekit_core::{
    AssetCollector, BuildMode, CollectResult, CollectedAsset, DependencyProvider, Error, Result,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use walkdir::WalkDir;

/// Extensions never collected, neither explicitly nor as dependencies.
pub const IGNORED_EXTENSIONS: &[&str] = &["meta", "cs", "dll", "pdb", "tmp", "ds_store"];

/// Whether an asset path is eligible for collection at all.
///
/// Hidden files (leading `.`) and [`IGNORED_EXTENSIONS`] are rejected.
pub fn is_valid_asset(asset_path: &str) -> bool {
    let file_name = asset_path.rsplit('/').next().unwrap_or(asset_path);
    if file_name.is_empty() || file_name.starts_with('.') {
        return false;
    }
    let ext = naming::extension_of(file_name);
    !IGNORED_EXTENSIONS.contains(&ext.as_str())
}

/// Collects assets from files under a project root.
pub struct PackageCollector {
    project_root: Utf8PathBuf,
    settings: CollectorSettings,
    rules: RuleRegistry,
    dependencies: Box<dyn DependencyProvider>,
}

impl PackageCollector {
    /// Create a collector with the built-in rule registry.
    ///
    /// Collect paths in `settings` are resolved relative to `project_root`.
    pub fn new(
        project_root: Utf8PathBuf,
        settings: CollectorSettings,
        dependencies: Box<dyn DependencyProvider>,
    ) -> Self {
        Self {
            project_root,
            settings,
            rules: RuleRegistry::with_builtins(),
            dependencies,
        }
    }

    /// Replace the rule registry, e.g. with one holding custom rules.
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    fn enumerate_collect_path(&self, entry: &CollectorEntry) -> Result<Vec<String>> {
        let collect_path = naming::normalize_asset_path(&entry.collect_path);
        let full = self.project_root.join(&collect_path);

        if full.as_std_path().is_file() {
            return Ok(vec![collect_path]);
        }
        if !full.as_std_path().is_dir() {
            return Err(Error::CollectPathNotFound(full));
        }

        let filter = self.rules.filter_rule(&entry.filter_rule)?;
        let mut assets = Vec::new();

        for dir_entry in WalkDir::new(full.as_std_path()).sort_by_file_name() {
            let dir_entry = dir_entry.map_err(|e| Error::Io(e.into()))?;
            if !dir_entry.file_type().is_file() {
                continue;
            }

            let path = match Utf8Path::from_path(dir_entry.path()) {
                Some(p) => p,
                None => {
                    tracing::warn!("Skipping non-UTF-8 path: {}", dir_entry.path().display());
                    continue;
                }
            };
            let Ok(rel) = path.strip_prefix(&self.project_root) else {
                continue;
            };

            let asset_path = naming::normalize_asset_path(rel.as_str());
            if !is_valid_asset(&asset_path) || !filter.is_collect_asset(&asset_path) {
                continue;
            }
            assets.push(asset_path);
        }

        Ok(assets)
    }

    fn collect_entry(
        &self,
        package_name: &str,
        group: &GroupSettings,
        group_tags: &[String],
        entry: &CollectorEntry,
    ) -> Result<Vec<CollectedAsset>> {
        let pack_rule = self.rules.pack_rule(&entry.pack_rule)?;
        let address_rule = self.rules.address_rule(&entry.address_rule)?;
        let collect_path = naming::normalize_asset_path(&entry.collect_path);

        let mut tags = group_tags.to_vec();
        for tag in split_tags(&entry.asset_tags) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let asset_paths = self.enumerate_collect_path(entry)?;
        let mut assets = Vec::with_capacity(asset_paths.len());

        for asset_path in asset_paths {
            let data = RuleData {
                asset_path: &asset_path,
                collect_path: &collect_path,
                group_name: &group.name,
                package_name,
            };

            let packed = pack_rule.pack(&data);
            let bundle_name = naming::make_bundle_name(
                package_name,
                &packed.bundle_name,
                &packed.bundle_extension,
                self.settings.unique_bundle_name,
            );

            let address =
                if self.settings.enable_addressable && entry.collector_type.is_addressable() {
                    address_rule.address(&data)
                } else {
                    String::new()
                };

            let is_raw = pack_rule.is_raw_file_rule();
            let dependencies = if is_raw {
                Vec::new()
            } else {
                self.dependencies
                    .dependencies(&asset_path)?
                    .into_iter()
                    .map(|d| naming::normalize_asset_path(&d))
                    .filter(|d| *d != asset_path && is_valid_asset(d))
                    .collect()
            };

            let mut asset = CollectedAsset::new(asset_path, bundle_name)
                .with_address(address)
                .with_tags(tags.iter().cloned())
                .with_dependencies(dependencies)
                .with_collector_kind(entry.collector_type);
            asset.is_raw = is_raw;
            assets.push(asset);
        }

        tracing::debug!(
            "Collector path={} pack_rule={} assets={}",
            collect_path,
            entry.pack_rule,
            assets.len()
        );

        Ok(assets)
    }
}

impl AssetCollector for PackageCollector {
    fn collect(&self, mode: BuildMode, package_name: &str) -> Result<CollectResult> {
        let package = self.settings.package(package_name)?;
        tracing::info!(
            "Collecting package={} mode={} groups={}",
            package.name,
            mode,
            package.groups.len()
        );

        let mut by_path: BTreeMap<String, CollectedAsset> = BTreeMap::new();

        for group in &package.groups {
            let active = self.rules.active_rule(&group.active_rule)?;
            if !active.is_active_group(&group.name) {
                tracing::debug!("Group '{}' inactive, skipping", group.name);
                continue;
            }

            let group_tags = split_tags(&group.asset_tags);
            for entry in &group.collectors {
                for asset in self.collect_entry(&package.name, group, &group_tags, entry)? {
                    merge_collected(&mut by_path, asset)?;
                }
            }
        }

        if self.settings.enable_addressable {
            check_unique_addresses(by_path.values())?;
        }

        tracing::info!("Collected {} assets for package={}", by_path.len(), package.name);

        Ok(CollectResult {
            package_name: package.name.clone(),
            assets: by_path.into_values().collect(),
            system_bundle_name: naming::system_bundle_name(&package.name),
        })
    }
}

/// Insert an asset, merging tags with an earlier collection of the same path.
fn merge_collected(
    by_path: &mut BTreeMap<String, CollectedAsset>,
    asset: CollectedAsset,
) -> Result<()> {
    match by_path.get_mut(&asset.path) {
        None => {
            by_path.insert(asset.path.clone(), asset);
        }
        Some(existing) if existing.bundle_name != asset.bundle_name => {
            return Err(Error::BundleCollision {
                path: asset.path,
                first: existing.bundle_name.clone(),
                second: asset.bundle_name,
            });
        }
        Some(existing) => {
            for tag in asset.tags {
                if !existing.tags.contains(&tag) {
                    existing.tags.push(tag);
                }
            }
        }
    }
    Ok(())
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

    #[test]
    fn test_is_valid_asset() {
        assert!(is_valid_asset("Assets/UI/Panel.prefab"));
        assert!(!is_valid_asset("Assets/UI/Panel.prefab.meta"));
        assert!(!is_valid_asset("Assets/Scripts/Player.cs"));
        assert!(!is_valid_asset("Assets/UI/.gitkeep"));
    }

    #[test]
    fn test_merge_collision() {
        let mut map = BTreeMap::new();
        merge_collected(&mut map, CollectedAsset::new("a.png", "x.bundle")).unwrap();
        merge_collected(
            &mut map,
            CollectedAsset::new("a.png", "x.bundle").with_tags(["hd"]),
        )
        .unwrap();
        assert_eq!(map["a.png"].tags, vec!["hd".to_string()]);

        let err = merge_collected(&mut map, CollectedAsset::new("a.png", "y.bundle")).unwrap_err();
        assert!(matches!(err, Error::BundleCollision { .. }));
    }

    #[test]
    fn test_duplicate_address() {
        let assets = [
            CollectedAsset::new("a/icon.png", "a.bundle").with_address("icon"),
            CollectedAsset::new("b/icon.png", "b.bundle").with_address("icon"),
        ];
        let err = check_unique_addresses(assets.iter()).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateAddress { ref address, .. } if address == "icon"
        ));
    }
}

//! Collected asset model and the collector contracts.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a build treats its inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    /// Wipe the package output root, then build everything.
    ForceRebuild,
    /// Keep the packager cache and rewrite only changed bundles.
    #[default]
    IncrementalBuild,
    /// Run the packager without writing bundles. Hashes are sentinels.
    DryRunBuild,
    /// Skip the packager entirely. Only the manifest is produced.
    SimulateBuild,
}

impl BuildMode {
    /// Whether this mode produces real bundle files on disk.
    pub fn writes_bundles(self) -> bool {
        matches!(self, BuildMode::ForceRebuild | BuildMode::IncrementalBuild)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildMode::ForceRebuild => "force-rebuild",
            BuildMode::IncrementalBuild => "incremental-build",
            BuildMode::DryRunBuild => "dry-run-build",
            BuildMode::SimulateBuild => "simulate-build",
        })
    }
}

/// The role a collector plays for the assets it produces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum CollectorKind {
    /// Addressable assets, listed in the manifest asset list.
    #[default]
    MainAssetCollector,
    /// Bundled under their declared name but not loadable by address.
    StaticAssetCollector,
    /// Bundled only when some primary asset depends on them.
    DependAssetCollector,
}

impl CollectorKind {
    /// Main assets are the only ones listed in the manifest asset list.
    pub fn is_addressable(self) -> bool {
        matches!(self, CollectorKind::MainAssetCollector)
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One explicitly collected asset, as produced by an [`AssetCollector`].
///
/// Immutable once handed to the build pipeline. `direct_dependency_paths` is the
/// dependency list as reported by the host asset database, already flattened:
/// the pipeline never expands it recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedAsset {
    pub path: String,
    pub bundle_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub is_raw: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub direct_dependency_paths: Vec<String>,
    #[serde(default)]
    pub collector_kind: CollectorKind,
}

impl CollectedAsset {
    /// Create a main asset with no address, tags or dependencies.
    pub fn new(path: impl Into<String>, bundle_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bundle_name: bundle_name.into(),
            address: String::new(),
            is_raw: false,
            tags: Vec::new(),
            direct_dependency_paths: Vec::new(),
            collector_kind: CollectorKind::MainAssetCollector,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.direct_dependency_paths = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_collector_kind(mut self, kind: CollectorKind) -> Self {
        self.collector_kind = kind;
        self
    }

    /// Mark the asset as a raw file, copied byte-for-byte into its own bundle.
    pub fn raw(mut self) -> Self {
        self.is_raw = true;
        self
    }
}

/// Everything a collector returns for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectResult {
    pub package_name: String,
    pub assets: Vec<CollectedAsset>,
    /// Package-scoped bundle that pools shared system assets (shaders).
    pub system_bundle_name: String,
}

/// Produces the explicitly authored assets of a package.
///
/// Implementations must guarantee that no two main assets share an address
/// when addressable mode is enabled, and that every asset path appears at
/// most once in [`CollectResult::assets`].
pub trait AssetCollector {
    fn collect(&self, mode: BuildMode, package_name: &str) -> Result<CollectResult>;
}

/// Host asset database boundary: resolves an asset path to its dependencies.
///
/// The returned list must be the full transitive set, excluding the asset itself.
pub trait DependencyProvider {
    fn dependencies(&self, asset_path: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collected_asset_builder() {
        let asset = CollectedAsset::new("assets/ui/icon.png", "assets_ui.bundle")
            .with_address("icon")
            .with_tags(["ui", "hd"])
            .with_dependencies(["assets/ui/atlas.mat"])
            .with_collector_kind(CollectorKind::StaticAssetCollector);

        assert_eq!(asset.address, "icon");
        assert_eq!(asset.tags, vec!["ui".to_string(), "hd".to_string()]);
        assert_eq!(asset.direct_dependency_paths.len(), 1);
        assert_eq!(asset.collector_kind, CollectorKind::StaticAssetCollector);
        assert!(!asset.is_raw);
        assert!(asset.clone().raw().is_raw);
    }

    #[test]
    fn test_only_main_assets_are_addressable() {
        assert!(CollectorKind::MainAssetCollector.is_addressable());
        assert!(!CollectorKind::StaticAssetCollector.is_addressable());
        assert!(!CollectorKind::DependAssetCollector.is_addressable());
    }

    #[test]
    fn test_build_mode_writes_bundles() {
        assert!(BuildMode::ForceRebuild.writes_bundles());
        assert!(BuildMode::IncrementalBuild.writes_bundles());
        assert!(!BuildMode::DryRunBuild.writes_bundles());
        assert!(!BuildMode::SimulateBuild.writes_bundles());
    }

    #[test]
    fn test_collected_asset_json_defaults() {
        let json = r#"{ "path": "a.txt", "bundle_name": "a.bundle" }"#;
        let asset: CollectedAsset = serde_json::from_str(json).unwrap();
        assert_eq!(asset, CollectedAsset::new("a.txt", "a.bundle"));
    }
}

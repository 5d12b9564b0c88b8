//! Packager contracts.
//!
//! The packager turns the bundle → asset list mapping into bundle files. Two
//! contracts exist, mirroring the two pipelines:
//!
//! - [`LegacyPackager`] packs every non-raw bundle in one call and returns a
//!   hash table plus a direct-dependency table. Raw files are copied by a
//!   separate task.
//! - [`ScriptablePackager`] returns per-bundle details and handles raw files
//!   itself.
//!
//! Both outputs implement [`PackagerReport`], the only surface later tasks
//! query. [`ArchivePackager`] is the bundled implementation of both.

mod archive;

pub use archive::*;

use crate::assignment::BuildMap;
use crate::context::{ContextKind, ContextObject};
use crate::error::Result;
use crate::parameters::BuildParameters;
use bundlekit_core::BuildMode;
use camino::Utf8PathBuf;
use std::collections::{BTreeMap, BTreeSet};

/// One bundle the packager should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleBuild {
    pub bundle_name: String,
    /// Project-relative paths of the assets assigned to the bundle.
    pub asset_paths: Vec<String>,
    pub is_raw: bool,
}

/// Everything a packager needs for one build.
#[derive(Debug, Clone)]
pub struct PackagerRequest {
    pub project_root: Utf8PathBuf,
    /// Directory bundles are written to, named after the bundle.
    pub output_dir: Utf8PathBuf,
    pub build_mode: BuildMode,
    pub bundles: Vec<BundleBuild>,
    /// Flattened dependency paths of every explicit asset.
    pub asset_dependencies: BTreeMap<String, Vec<String>>,
}

impl PackagerRequest {
    /// Build a request from the bundle layout. Raw bundles are left out
    /// unless `include_raw` is set.
    pub fn from_build_map(map: &BuildMap, parameters: &BuildParameters, include_raw: bool) -> Self {
        let bundles = map
            .bundles
            .iter()
            .filter(|bundle| include_raw || !bundle.is_raw)
            .map(|bundle| BundleBuild {
                bundle_name: bundle.bundle_name.clone(),
                asset_paths: map.members(bundle).map(|a| a.path.clone()).collect(),
                is_raw: bundle.is_raw,
            })
            .collect();

        Self {
            project_root: parameters.project_root.clone(),
            output_dir: parameters.pipeline_output_dir(),
            build_mode: parameters.build_mode,
            bundles,
            asset_dependencies: map.explicit_dependencies(),
        }
    }

    /// Whether the packager should compute everything but write nothing.
    pub fn dry_run(&self) -> bool {
        self.build_mode == BuildMode::DryRunBuild
    }

    /// Owning bundle of every assigned asset path.
    pub fn owners(&self) -> BTreeMap<&str, &str> {
        self.bundles
            .iter()
            .flat_map(|bundle| {
                bundle
                    .asset_paths
                    .iter()
                    .map(move |path| (path.as_str(), bundle.bundle_name.as_str()))
            })
            .collect()
    }
}

/// Uniform query surface over either packager's output.
pub trait PackagerReport {
    /// Every bundle the packager produced, sorted.
    fn bundle_names(&self) -> Vec<String>;

    /// The packager's own hash of a bundle's contents.
    fn content_hash(&self, bundle_name: &str) -> Option<&str>;

    /// Bundles the given bundle directly depends on. Not transitive.
    fn direct_dependencies(&self, bundle_name: &str) -> &[String];
}

/// Contract of the monolithic packager.
pub trait LegacyPackager {
    fn build(&self, request: &PackagerRequest) -> Result<LegacyBuildOutput>;
}

/// Contract of the incremental packager.
pub trait ScriptablePackager {
    fn build(&self, request: &PackagerRequest) -> Result<ScriptableBuildOutput>;
}

/// Output of a [`LegacyPackager`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyBuildOutput {
    pub bundle_hashes: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl PackagerReport for LegacyBuildOutput {
    fn bundle_names(&self) -> Vec<String> {
        self.bundle_hashes.keys().cloned().collect()
    }

    fn content_hash(&self, bundle_name: &str) -> Option<&str> {
        self.bundle_hashes.get(bundle_name).map(String::as_str)
    }

    fn direct_dependencies(&self, bundle_name: &str) -> &[String] {
        self.dependencies
            .get(bundle_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Per-bundle result of a [`ScriptablePackager`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptableBundleDetails {
    pub hash: String,
    pub crc: u32,
    pub dependencies: Vec<String>,
}

/// Output of a [`ScriptablePackager`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptableBuildOutput {
    pub bundles: BTreeMap<String, ScriptableBundleDetails>,
}

impl PackagerReport for ScriptableBuildOutput {
    fn bundle_names(&self) -> Vec<String> {
        self.bundles.keys().cloned().collect()
    }

    fn content_hash(&self, bundle_name: &str) -> Option<&str> {
        self.bundles.get(bundle_name).map(|b| b.hash.as_str())
    }

    fn direct_dependencies(&self, bundle_name: &str) -> &[String] {
        self.bundles
            .get(bundle_name)
            .map(|b| b.dependencies.as_slice())
            .unwrap_or_default()
    }
}

/// Report standing in for the packager in simulate mode.
///
/// Bundle dependencies are derived from the asset graph: a bundle depends on
/// every other bundle owning one of its members' dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulateReport {
    dependencies: BTreeMap<String, Vec<String>>,
}

impl SimulateReport {
    pub fn from_build_map(map: &BuildMap) -> Self {
        let dependencies = map
            .bundles
            .iter()
            .map(|bundle| {
                let deps: BTreeSet<&str> = bundle
                    .members
                    .iter()
                    .flat_map(|&id| map.dependency_bundles(id, &bundle.bundle_name))
                    .collect();
                (
                    bundle.bundle_name.clone(),
                    deps.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        Self { dependencies }
    }
}

impl PackagerReport for SimulateReport {
    fn bundle_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    fn content_hash(&self, _bundle_name: &str) -> Option<&str> {
        None
    }

    fn direct_dependencies(&self, bundle_name: &str) -> &[String] {
        self.dependencies
            .get(bundle_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The packager's output, published by the building task.
pub struct PackagerContext {
    pub report: Box<dyn PackagerReport>,
}

impl PackagerContext {
    pub fn new(report: impl PackagerReport + 'static) -> Self {
        Self {
            report: Box::new(report),
        }
    }
}

impl ContextObject for PackagerContext {
    const KIND: ContextKind = ContextKind::Packager;
}

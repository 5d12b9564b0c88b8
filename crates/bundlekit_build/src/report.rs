//! Human-readable build report.
//!
//! Written as `BuildReport_{package}_{version}.json` next to the packager
//! output and copied into the package directory. The report is for review
//! only; nothing in the pipeline reads it back.

use crate::assignment::BuildMap;
use crate::context::{ContextKind, ContextObject};
use crate::error::{Error, Result};
use crate::parameters::{BuildParameters, EncryptionKind, PipelineKind};
use bundlekit_core::{BuildMode, CollectorKind};
use bundlekit_manifest::{LoadMethod, OutputNameStyle, PatchManifest};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub fn report_file_name(package_name: &str, package_version: &str) -> String {
    format!("BuildReport_{}_{}.json", package_name, package_version)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub summary: ReportSummary,
    pub bundle_infos: Vec<ReportBundleInfo>,
    pub asset_infos: Vec<ReportAssetInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub package_name: String,
    pub package_version: String,
    pub build_mode: BuildMode,
    pub pipeline: PipelineKind,
    pub output_name_style: OutputNameStyle,
    pub encryption: EncryptionKind,
    pub enable_addressable: bool,
    pub unique_bundle_name: bool,

    pub bundle_count: usize,
    pub raw_bundle_count: usize,
    pub encrypted_bundle_count: usize,
    /// Assets listed in the manifest.
    pub main_asset_count: usize,
    /// Assets placed in a bundle.
    pub total_asset_count: usize,
    pub folded_asset_count: usize,
    pub pruned_asset_count: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBundleInfo {
    pub bundle_name: String,
    pub output_file_name: String,
    pub content_hash: String,
    pub file_hash: String,
    pub file_crc: u32,
    pub file_size: u64,
    pub is_raw_file: bool,
    pub encrypted: bool,
    pub load_method: LoadMethod,
    pub tags: Vec<String>,
    /// Bundles that depend on this one.
    pub reference_bundles: Vec<String>,
    pub member_assets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAssetInfo {
    pub address: String,
    pub asset_path: String,
    pub asset_tags: Vec<String>,
    pub main_bundle_name: String,
    pub main_bundle_size: u64,
    pub depend_bundles: Vec<String>,
    pub depend_assets: Vec<String>,
}

impl BuildReport {
    pub fn create(map: &BuildMap, manifest: &PatchManifest, parameters: &BuildParameters) -> Self {
        let bundle_name = |id: u32| {
            manifest
                .bundle(id)
                .map(|bundle| bundle.bundle_name.clone())
                .unwrap_or_default()
        };

        let bundle_infos = map
            .bundles
            .iter()
            .zip(&manifest.bundle_list)
            .map(|(bundle, patch)| ReportBundleInfo {
                bundle_name: bundle.bundle_name.clone(),
                output_file_name: bundle.output_file_name.clone(),
                content_hash: bundle.content_hash.clone(),
                file_hash: bundle.file_hash.clone(),
                file_crc: bundle.crc,
                file_size: bundle.size,
                is_raw_file: bundle.is_raw,
                encrypted: bundle.encrypted_path.is_some(),
                load_method: bundle.load_method,
                tags: bundle.tags.clone(),
                reference_bundles: patch.reference_ids.iter().map(|&id| bundle_name(id)).collect(),
                member_assets: map.members(bundle).map(|a| a.path.clone()).collect(),
            })
            .collect();

        let asset_infos = manifest
            .asset_list
            .iter()
            .map(|asset| ReportAssetInfo {
                address: asset.address.clone(),
                asset_path: asset.asset_path.clone(),
                asset_tags: asset.asset_tags.clone(),
                main_bundle_name: bundle_name(asset.bundle_id),
                main_bundle_size: manifest
                    .bundle(asset.bundle_id)
                    .map(|b| b.file_size)
                    .unwrap_or_default(),
                depend_bundles: asset.depend_ids.iter().map(|&id| bundle_name(id)).collect(),
                depend_assets: map
                    .graph
                    .id_of(&asset.asset_path)
                    .map(|id| map.graph.dependency_paths(id).map(str::to_string).collect())
                    .unwrap_or_default(),
            })
            .collect();

        let main_asset_count = map
            .graph
            .iter()
            .filter(|(_, a)| a.collector_kind == Some(CollectorKind::MainAssetCollector))
            .count();

        let summary = ReportSummary {
            package_name: parameters.package_name.clone(),
            package_version: parameters.package_version.clone(),
            build_mode: parameters.build_mode,
            pipeline: parameters.pipeline,
            output_name_style: parameters.output_name_style,
            encryption: parameters.encryption,
            enable_addressable: map.enable_addressable,
            unique_bundle_name: map.unique_bundle_name,
            bundle_count: map.bundles.len(),
            raw_bundle_count: map.bundles.iter().filter(|b| b.is_raw).count(),
            encrypted_bundle_count: map
                .bundles
                .iter()
                .filter(|b| b.encrypted_path.is_some())
                .count(),
            main_asset_count,
            total_asset_count: map.total_asset_count,
            folded_asset_count: map.folded_asset_count,
            pruned_asset_count: map.graph.pruned().len(),
            total_size: manifest.total_size(),
        };

        Self {
            summary,
            bundle_infos,
            asset_infos,
        }
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::io_at(parent))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(Error::io_at(path))?;
        Ok(())
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::io_at(path))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn bundle(&self, bundle_name: &str) -> Option<&ReportBundleInfo> {
        self.bundle_infos
            .iter()
            .find(|info| info.bundle_name == bundle_name)
    }
}

/// Location of the written report, published by the report task.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub report_path: Utf8PathBuf,
}

impl ContextObject for ReportContext {
    const KIND: ContextKind = ContextKind::Report;
}

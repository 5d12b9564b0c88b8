//! The patch manifest written next to every built package.
//!
//! A [`PatchManifest`] lists every bundle of a package and every explicitly
//! collected asset. Assets and bundles refer to each other by index into
//! [`PatchManifest::bundle_list`], which keeps the binary form compact.
//!
//! Two encodings carry the same logical content:
//!
//! - a little-endian binary form (see [`PatchManifest::write_to`] /
//!   [`PatchManifest::read_from`]) loaded by the runtime, and
//! - a pretty-printed JSON mirror for review and diffing.

use binrw::binrw;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod error;
mod files;
mod read;
mod write;

pub use error::*;
pub use files::*;

/// Magic at the start of a binary manifest.
pub const MANIFEST_MAGIC: [u8; 4] = *b"BKMF";

/// Format version baked into every manifest header.
pub const MANIFEST_FILE_VERSION: &str = "1.0.0";

/// How the runtime should open a bundle file.
#[binrw]
#[brw(little, repr = u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadMethod {
    #[default]
    Normal = 0,
    /// The bundle is prefixed with a header that must be skipped.
    LoadFromFileOffset = 1,
    /// The whole file is decrypted into memory before loading.
    LoadFromMemory = 2,
    /// The file is read through a decrypting stream.
    LoadFromStream = 3,
}

/// How bundle output files are named inside the package directory.
#[binrw]
#[brw(little, repr = u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputNameStyle {
    /// `{file_hash}.{ext}`
    HashName = 0,
    /// `{bundle_stem}.{ext}`
    BundleName = 1,
    /// `{bundle_stem}-{file_hash}.{ext}`
    #[default]
    BundleNameHashName = 2,
}

impl OutputNameStyle {
    /// File name of a bundle in the package output directory.
    ///
    /// `extension` is the bundle extension for packaged bundles, or the
    /// original file extension for raw bundles.
    pub fn file_name(&self, bundle_name: &str, file_hash: &str, extension: &str) -> String {
        let stem = bundlekit_core::naming::bundle_stem(bundle_name);
        let name = match self {
            OutputNameStyle::HashName => file_hash.to_string(),
            OutputNameStyle::BundleName => stem.to_string(),
            OutputNameStyle::BundleNameHashName => format!("{}-{}", stem, file_hash),
        };
        if extension.is_empty() {
            name
        } else {
            format!("{}.{}", name, extension)
        }
    }
}

/// One bundle of the package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchBundle {
    pub bundle_name: String,
    pub file_hash: String,
    pub file_crc: u32,
    pub file_size: u64,
    pub is_raw_file: bool,
    pub load_method: LoadMethod,
    pub tags: Vec<String>,

    /// Indices of the bundles whose direct dependencies include this one.
    pub reference_ids: Vec<u32>,
}

/// One explicitly collected asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchAsset {
    /// Logical address. Empty when addressable mode is off.
    pub address: String,
    pub asset_path: String,
    pub asset_tags: Vec<String>,

    /// Index of the owning bundle.
    pub bundle_id: u32,

    /// Indices of every other bundle this asset needs loaded.
    pub depend_ids: Vec<u32>,
}

/// The versioned manifest of one package build.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PatchManifest {
    pub file_version: String,
    pub enable_addressable: bool,
    pub output_name_style: OutputNameStyle,
    pub package_name: String,
    pub package_version: String,
    pub bundle_list: Vec<PatchBundle>,
    pub asset_list: Vec<PatchAsset>,
}

impl PatchManifest {
    /// Create an empty manifest stamped with the current format version.
    pub fn new(package_name: impl Into<String>, package_version: impl Into<String>) -> Self {
        Self {
            file_version: MANIFEST_FILE_VERSION.to_string(),
            enable_addressable: false,
            output_name_style: OutputNameStyle::default(),
            package_name: package_name.into(),
            package_version: package_version.into(),
            bundle_list: Vec::new(),
            asset_list: Vec::new(),
        }
    }

    pub fn with_addressable(mut self, enable_addressable: bool) -> Self {
        self.enable_addressable = enable_addressable;
        self
    }

    pub fn with_output_name_style(mut self, style: OutputNameStyle) -> Self {
        self.output_name_style = style;
        self
    }

    /// Index of the bundle with the given name.
    pub fn bundle_id(&self, bundle_name: &str) -> Option<u32> {
        self.bundle_list
            .iter()
            .position(|bundle| bundle.bundle_name == bundle_name)
            .map(|index| index as u32)
    }

    pub fn bundle(&self, id: u32) -> Option<&PatchBundle> {
        self.bundle_list.get(id as usize)
    }

    /// Find an asset by address, or by path when the address is empty.
    pub fn find_asset(&self, location: &str) -> Option<&PatchAsset> {
        self.asset_list.iter().find(|asset| {
            if asset.address.is_empty() {
                asset.asset_path == location
            } else {
                asset.address == location || asset.asset_path == location
            }
        })
    }

    /// Total size of all bundle files in bytes.
    pub fn total_size(&self) -> u64 {
        self.bundle_list.iter().map(|bundle| bundle.file_size).sum()
    }

    /// Check that every stored index resolves and that nothing points at itself.
    pub fn validate(&self) -> Result<()> {
        let count = self.bundle_list.len();

        for (index, bundle) in self.bundle_list.iter().enumerate() {
            for &id in &bundle.reference_ids {
                if id as usize >= count {
                    return Err(ManifestError::BundleIdOutOfRange {
                        owner: bundle.bundle_name.clone(),
                        id,
                        count,
                    });
                }
                if id as usize == index {
                    return Err(ManifestError::SelfReference(bundle.bundle_name.clone()));
                }
            }
        }

        for asset in &self.asset_list {
            for &id in std::iter::once(&asset.bundle_id).chain(&asset.depend_ids) {
                if id as usize >= count {
                    return Err(ManifestError::BundleIdOutOfRange {
                        owner: asset.asset_path.clone(),
                        id,
                        count,
                    });
                }
            }
            if asset.depend_ids.contains(&asset.bundle_id) {
                return Err(ManifestError::SelfDependency(asset.asset_path.clone()));
            }
        }

        Ok(())
    }

    /// Serialize the JSON mirror.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Display for LoadMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LoadMethod::Normal => "normal",
            LoadMethod::LoadFromFileOffset => "file-offset",
            LoadMethod::LoadFromMemory => "memory",
            LoadMethod::LoadFromStream => "stream",
        })
    }
}

impl Display for OutputNameStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputNameStyle::HashName => "hash-name",
            OutputNameStyle::BundleName => "bundle-name",
            OutputNameStyle::BundleNameHashName => "bundle-name-hash-name",
        })
    }
}

//! Collector settings file model.
//!
//! The settings describe, per package, which directories to collect and which
//! named rules decide bundle names, addresses and inclusion. They are loaded
//! from `bundlekit.config.json` or `bundlekit.config.toml`.

use bundlekit_core::{CollectorKind, Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// File names probed by [`CollectorSettings::find_in_dir`], in order.
pub const SETTINGS_FILE_NAMES: [&str; 2] = ["bundlekit.config.json", "bundlekit.config.toml"];

/// Top-level collector settings.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct CollectorSettings {
    /// Resolve an address for every main asset and require addresses to be unique.
    #[serde(default)]
    pub enable_addressable: bool,

    /// Prefix every bundle name with the package name.
    #[serde(default)]
    pub unique_bundle_name: bool,

    pub packages: Vec<PackageSettings>,
}

/// One independently built package.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct PackageSettings {
    /// Package name. Must be a slug (letters, digits, `_`, `-`).
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub groups: Vec<GroupSettings>,
}

/// A named set of collectors sharing tags and an activation rule.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GroupSettings {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the [`ActiveRule`](crate::ActiveRule) deciding whether this group is collected.
    #[serde(default = "default_active_rule")]
    pub active_rule: String,

    /// `;`-separated tags applied to every asset of the group.
    #[serde(default)]
    pub asset_tags: String,

    #[serde(default)]
    pub collectors: Vec<CollectorEntry>,
}

/// One collect path and the rules applied to what it yields.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct CollectorEntry {
    /// File or directory, relative to the project root.
    pub collect_path: String,

    #[serde(default)]
    pub collector_type: CollectorKind,

    #[serde(default = "default_address_rule")]
    pub address_rule: String,

    #[serde(default = "default_pack_rule")]
    pub pack_rule: String,

    #[serde(default = "default_filter_rule")]
    pub filter_rule: String,

    /// `;`-separated tags applied to every asset of this collector.
    #[serde(default)]
    pub asset_tags: String,
}

fn default_active_rule() -> String {
    "EnableGroup".to_string()
}

fn default_address_rule() -> String {
    "AddressByFileName".to_string()
}

fn default_pack_rule() -> String {
    "PackDirectory".to_string()
}

fn default_filter_rule() -> String {
    "CollectAll".to_string()
}

impl CollectorSettings {
    /// Load settings from a `.json` or `.toml` file, chosen by extension.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("toml") => Ok(toml::from_str(&contents)?),
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Err(Error::InvalidSettings(format!(
                "unsupported settings file extension: {}",
                path
            ))),
        }
    }

    /// Look for a settings file directly inside `dir`.
    pub fn find_in_dir(dir: &Utf8Path) -> Option<Utf8PathBuf> {
        SETTINGS_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.as_std_path().is_file())
    }

    pub fn package(&self, name: &str) -> Result<&PackageSettings> {
        self.packages
            .iter()
            .find(|package| package.name == name)
            .ok_or_else(|| Error::PackageNotFound(name.to_string()))
    }
}

/// Split a `;`-separated tag string, trimming whitespace and dropping
/// empty entries and duplicates while keeping the original order.
pub fn split_tags(tags: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

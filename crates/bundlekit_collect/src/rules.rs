//! Pluggable collection rules and their name-keyed registry.
//!
//! Settings files reference rules by name (`"pack_rule": "PackDirectory"`). The
//! [`RuleRegistry`] maps those names to implementations. It is built once, with
//! the built-in rules pre-registered, and custom rules can be added before
//! collection starts.

use bundlekit_core::naming::{self, BUNDLE_EXTENSION, RAW_BUNDLE_EXTENSION};
use bundlekit_core::{Error, Result};
use std::collections::BTreeMap;

/// Context handed to pack and address rules for one asset.
#[derive(Debug, Clone, Copy)]
pub struct RuleData<'a> {
    /// Asset path relative to the project root, forward slashes.
    pub asset_path: &'a str,
    /// The collector's collect path, forward slashes.
    pub collect_path: &'a str,
    pub group_name: &'a str,
    pub package_name: &'a str,
}

/// Un-normalized bundle name and extension chosen by a [`PackRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRuleResult {
    pub bundle_name: String,
    pub bundle_extension: String,
}

impl PackRuleResult {
    pub fn new(bundle_name: impl Into<String>, bundle_extension: impl Into<String>) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            bundle_extension: bundle_extension.into(),
        }
    }
}

/// Decides which bundle an asset is packed into.
pub trait PackRule: Send + Sync {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult;

    /// Raw-file rules produce passthrough bundles holding exactly one file.
    fn is_raw_file_rule(&self) -> bool {
        false
    }
}

/// Produces the runtime address of a main asset.
pub trait AddressRule: Send + Sync {
    fn address(&self, data: &RuleData<'_>) -> String;
}

/// Decides whether a file found under a collect directory is collected.
pub trait FilterRule: Send + Sync {
    fn is_collect_asset(&self, asset_path: &str) -> bool;
}

/// Decides whether a whole group takes part in the build.
pub trait ActiveRule: Send + Sync {
    fn is_active_group(&self, group_name: &str) -> bool;
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn file_stem(path: &str) -> &str {
    let name = &path[path.rfind('/').map(|i| i + 1).unwrap_or(0)..];
    naming::strip_extension(name)
}

/// One bundle per asset.
pub struct PackSeparately;

impl PackRule for PackSeparately {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        PackRuleResult::new(naming::strip_extension(data.asset_path), BUNDLE_EXTENSION)
    }
}

/// One bundle per containing directory.
pub struct PackDirectory;

impl PackRule for PackDirectory {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        PackRuleResult::new(parent_dir(data.asset_path), BUNDLE_EXTENSION)
    }
}

/// One bundle per first-level directory below the collect path.
///
/// Assets sitting directly in the collect path are packed by directory.
pub struct PackTopDirectory;

impl PackRule for PackTopDirectory {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        let prefix = format!("{}/", data.collect_path.trim_end_matches('/'));
        let top = data
            .asset_path
            .strip_prefix(&prefix)
            .and_then(|rest| rest.split_once('/'))
            .map(|(top, _)| format!("{}{}", prefix, top));

        match top {
            Some(dir) => PackRuleResult::new(dir, BUNDLE_EXTENSION),
            None => PackDirectory.pack(data),
        }
    }
}

/// One bundle for everything a collector yields.
pub struct PackCollector;

impl PackRule for PackCollector {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        PackRuleResult::new(naming::strip_extension(data.collect_path), BUNDLE_EXTENSION)
    }
}

/// One bundle for the whole group.
pub struct PackGroup;

impl PackRule for PackGroup {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        PackRuleResult::new(data.group_name, BUNDLE_EXTENSION)
    }
}

/// Passthrough bundle holding the file bytes unchanged.
pub struct PackRawFile;

impl PackRule for PackRawFile {
    fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
        PackRuleResult::new(naming::strip_extension(data.asset_path), RAW_BUNDLE_EXTENSION)
    }

    fn is_raw_file_rule(&self) -> bool {
        true
    }
}

/// `Assets/UI/Login.prefab` -> `Login`
pub struct AddressByFileName;

impl AddressRule for AddressByFileName {
    fn address(&self, data: &RuleData<'_>) -> String {
        file_stem(data.asset_path).to_string()
    }
}

/// `Assets/UI/Login.prefab` -> `UI/Login`
pub struct AddressByFolderAndFileName;

impl AddressRule for AddressByFolderAndFileName {
    fn address(&self, data: &RuleData<'_>) -> String {
        let folder = file_stem(parent_dir(data.asset_path));
        if folder.is_empty() {
            file_stem(data.asset_path).to_string()
        } else {
            format!("{}/{}", folder, file_stem(data.asset_path))
        }
    }
}

/// `Assets/UI/Login.prefab` in group `Main` -> `Main_Login`
pub struct AddressByGroupAndFileName;

impl AddressRule for AddressByGroupAndFileName {
    fn address(&self, data: &RuleData<'_>) -> String {
        format!("{}_{}", data.group_name, file_stem(data.asset_path))
    }
}

pub struct AddressDisable;

impl AddressRule for AddressDisable {
    fn address(&self, _data: &RuleData<'_>) -> String {
        String::new()
    }
}

/// Filter accepting files whose extension is in a fixed list.
pub struct CollectByExtension {
    extensions: &'static [&'static str],
}

impl FilterRule for CollectByExtension {
    fn is_collect_asset(&self, asset_path: &str) -> bool {
        let ext = naming::extension_of(asset_path);
        self.extensions.iter().any(|e| *e == ext)
    }
}

pub struct CollectAll;

impl FilterRule for CollectAll {
    fn is_collect_asset(&self, _asset_path: &str) -> bool {
        true
    }
}

pub struct EnableGroup;

impl ActiveRule for EnableGroup {
    fn is_active_group(&self, _group_name: &str) -> bool {
        true
    }
}

pub struct DisableGroup;

impl ActiveRule for DisableGroup {
    fn is_active_group(&self, _group_name: &str) -> bool {
        false
    }
}

/// Name-keyed table of collection rules.
pub struct RuleRegistry {
    pack: BTreeMap<String, Box<dyn PackRule>>,
    address: BTreeMap<String, Box<dyn AddressRule>>,
    filter: BTreeMap<String, Box<dyn FilterRule>>,
    active: BTreeMap<String, Box<dyn ActiveRule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("pack", &self.pack.keys().collect::<Vec<_>>())
            .field("address", &self.address.keys().collect::<Vec<_>>())
            .field("filter", &self.filter.keys().collect::<Vec<_>>())
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RuleRegistry {
    /// A registry with no rules at all.
    pub fn empty() -> Self {
        Self {
            pack: BTreeMap::new(),
            address: BTreeMap::new(),
            filter: BTreeMap::new(),
            active: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in rule under its canonical name.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register_pack_rule("PackSeparately", PackSeparately);
        registry.register_pack_rule("PackDirectory", PackDirectory);
        registry.register_pack_rule("PackTopDirectory", PackTopDirectory);
        registry.register_pack_rule("PackCollector", PackCollector);
        registry.register_pack_rule("PackGroup", PackGroup);
        registry.register_pack_rule("PackRawFile", PackRawFile);

        registry.register_address_rule("AddressByFileName", AddressByFileName);
        registry.register_address_rule("AddressByFolderAndFileName", AddressByFolderAndFileName);
        registry.register_address_rule("AddressByGroupAndFileName", AddressByGroupAndFileName);
        registry.register_address_rule("AddressDisable", AddressDisable);

        registry.register_filter_rule("CollectAll", CollectAll);
        registry.register_filter_rule(
            "CollectScene",
            CollectByExtension {
                extensions: &["unity", "scene"],
            },
        );
        registry.register_filter_rule(
            "CollectPrefab",
            CollectByExtension {
                extensions: &["prefab"],
            },
        );
        registry.register_filter_rule(
            "CollectSprite",
            CollectByExtension {
                extensions: &["png", "jpg", "jpeg", "tga", "psd"],
            },
        );
        registry.register_filter_rule(
            "CollectShader",
            CollectByExtension {
                extensions: &["shader", "shadervariants"],
            },
        );

        registry.register_active_rule("EnableGroup", EnableGroup);
        registry.register_active_rule("DisableGroup", DisableGroup);

        registry
    }

    /// Register a pack rule, replacing any rule already registered under `name`.
    pub fn register_pack_rule(&mut self, name: impl Into<String>, rule: impl PackRule + 'static) {
        self.pack.insert(name.into(), Box::new(rule));
    }

    pub fn register_address_rule(
        &mut self,
        name: impl Into<String>,
        rule: impl AddressRule + 'static,
    ) {
        self.address.insert(name.into(), Box::new(rule));
    }

    pub fn register_filter_rule(
        &mut self,
        name: impl Into<String>,
        rule: impl FilterRule + 'static,
    ) {
        self.filter.insert(name.into(), Box::new(rule));
    }

    pub fn register_active_rule(
        &mut self,
        name: impl Into<String>,
        rule: impl ActiveRule + 'static,
    ) {
        self.active.insert(name.into(), Box::new(rule));
    }

    pub fn pack_rule(&self, name: &str) -> Result<&dyn PackRule> {
        self.pack
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("pack", name))
    }

    pub fn address_rule(&self, name: &str) -> Result<&dyn AddressRule> {
        self.address
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("address", name))
    }

    pub fn filter_rule(&self, name: &str) -> Result<&dyn FilterRule> {
        self.filter
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("filter", name))
    }

    pub fn active_rule(&self, name: &str) -> Result<&dyn ActiveRule> {
        self.active
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("active", name))
    }
}

fn unknown(kind: &'static str, name: &str) -> Error {
    Error::UnknownRule {
        kind,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data<'a>(asset_path: &'a str, collect_path: &'a str) -> RuleData<'a> {
        RuleData {
            asset_path,
            collect_path,
            group_name: "Main",
            package_name: "DefaultPackage",
        }
    }

    #[test]
    fn test_pack_rules() {
        let d = data("Assets/UI/Login/Panel.prefab", "Assets/UI");

        assert_eq!(
            PackSeparately.pack(&d),
            PackRuleResult::new("Assets/UI/Login/Panel", "bundle")
        );
        assert_eq!(
            PackDirectory.pack(&d),
            PackRuleResult::new("Assets/UI/Login", "bundle")
        );
        assert_eq!(
            PackTopDirectory.pack(&d),
            PackRuleResult::new("Assets/UI/Login", "bundle")
        );
        assert_eq!(
            PackCollector.pack(&d),
            PackRuleResult::new("Assets/UI", "bundle")
        );
        assert_eq!(PackGroup.pack(&d), PackRuleResult::new("Main", "bundle"));
        assert_eq!(
            PackRawFile.pack(&d),
            PackRuleResult::new("Assets/UI/Login/Panel", "rawfile")
        );
        assert!(PackRawFile.is_raw_file_rule());
        assert!(!PackDirectory.is_raw_file_rule());
    }

    #[test]
    fn test_pack_top_directory_falls_back_for_shallow_assets() {
        let d = data("Assets/UI/Root.prefab", "Assets/UI");
        assert_eq!(
            PackTopDirectory.pack(&d),
            PackRuleResult::new("Assets/UI", "bundle")
        );
    }

    #[test]
    fn test_address_rules() {
        let d = data("Assets/UI/Login/Panel.prefab", "Assets/UI");

        assert_eq!(AddressByFileName.address(&d), "Panel");
        assert_eq!(AddressByFolderAndFileName.address(&d), "Login/Panel");
        assert_eq!(AddressByGroupAndFileName.address(&d), "Main_Panel");
        assert_eq!(AddressDisable.address(&d), "");
    }

    #[test]
    fn test_filter_rules() {
        let registry = RuleRegistry::with_builtins();

        let prefab = registry.filter_rule("CollectPrefab").unwrap();
        assert!(prefab.is_collect_asset("Assets/UI/Panel.PREFAB"));
        assert!(!prefab.is_collect_asset("Assets/UI/Panel.png"));

        let sprite = registry.filter_rule("CollectSprite").unwrap();
        assert!(sprite.is_collect_asset("Assets/UI/icon.png"));

        assert!(registry
            .filter_rule("CollectAll")
            .unwrap()
            .is_collect_asset("anything"));
    }

    #[test]
    fn test_active_rules() {
        let registry = RuleRegistry::with_builtins();
        assert!(registry
            .active_rule("EnableGroup")
            .unwrap()
            .is_active_group("g"));
        assert!(!registry
            .active_rule("DisableGroup")
            .unwrap()
            .is_active_group("g"));
    }

    #[test]
    fn test_unknown_rule() {
        let registry = RuleRegistry::with_builtins();
        let err = registry.pack_rule("PackEverythingTwice").err().unwrap();
        assert!(matches!(
            err,
            Error::UnknownRule { kind: "pack", ref name } if name == "PackEverythingTwice"
        ));
    }

    #[test]
    fn test_custom_rule_registration() {
        struct PackByExtension;
        impl PackRule for PackByExtension {
            fn pack(&self, data: &RuleData<'_>) -> PackRuleResult {
                PackRuleResult::new(naming::extension_of(data.asset_path), "bundle")
            }
        }

        let mut registry = RuleRegistry::with_builtins();
        registry.register_pack_rule("PackByExtension", PackByExtension);

        let rule = registry.pack_rule("PackByExtension").unwrap();
        assert_eq!(
            rule.pack(&data("Assets/a.png", "Assets")),
            PackRuleResult::new("png", "bundle")
        );
    }
}

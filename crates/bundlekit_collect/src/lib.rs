//! Asset collection for bundlekit.
//!
//! This crate reads collector settings (`bundlekit.config.json` or
//! `bundlekit.config.toml`), resolves the named pack / address / filter / active
//! rules through a [`RuleRegistry`], and implements the
//! [`AssetCollector`](bundlekit_core::AssetCollector) contract over files in a
//! project directory with [`PackageCollector`].
//!
//! # Example
//!
//! ```no_run
//! use bundlekit_collect::{CollectorSettings, DependencyTable, PackageCollector};
//! use bundlekit_core::{AssetCollector, BuildMode};
//! use camino::Utf8PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Utf8PathBuf::from("my-game");
//! let settings = CollectorSettings::load(&root.join("bundlekit.config.json"))?;
//! let deps = DependencyTable::load(&root.join("deps.json"))?;
//!
//! let collector = PackageCollector::new(root, settings, Box::new(deps));
//! let result = collector.collect(BuildMode::IncrementalBuild, "DefaultPackage")?;
//! println!("{} assets", result.assets.len());
//! # Ok(())
//! # }
//! ```

mod collector;
mod dependency;
pub mod rules;
mod settings;

pub use collector::{is_valid_asset, PackageCollector, IGNORED_EXTENSIONS};
pub use dependency::DependencyTable;
pub use rules::{
    ActiveRule, AddressRule, FilterRule, PackRule, PackRuleResult, RuleData, RuleRegistry,
};
pub use settings::{
    split_tags, CollectorEntry, CollectorSettings, GroupSettings, PackageSettings,
    SETTINGS_FILE_NAMES,
};

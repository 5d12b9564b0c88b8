//! Asset bundle build pipeline.
//!
//! This crate turns a collector's explicit assets into deployable bundles and
//! a versioned manifest:
//!
//! - **Dependency graph**: expand explicit assets into every referenced asset
//! - **Bundle assignment**: keep declared bundles, pool system assets, move
//!   multiply-referenced dependencies into shared bundles, fold the rest
//! - **Task pipeline**: ordered tasks sharing a write-once [`BuildContext`]
//! - **Manifest generation**: bundle list, asset list and the bundle
//!   reference graph recomputed from the packager's dependency table
//! - **Incremental hashing**: content hash, file hash, CRC and size per bundle
//!
//! # Example
//!
//! ```no_run
//! use bundlekit_build::{AssetBundleBuilder, BuildParameters};
//! use bundlekit_collect::{CollectorSettings, DependencyTable, PackageCollector};
//! use camino::Utf8PathBuf;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Utf8PathBuf::from("my-game");
//! let settings = CollectorSettings::load(&root.join("bundlekit.config.json"))?;
//! let deps = DependencyTable::load(&root.join("deps.json"))?;
//! let collector = PackageCollector::new(root.clone(), settings, Box::new(deps));
//!
//! let parameters = BuildParameters::new(root, "build", "DefaultPackage", "v1");
//! let mut builder = AssetBundleBuilder::new(parameters, Arc::new(collector))
//!     .with_progress(|progress| {
//!         println!("{}: {}/{}", progress.task, progress.current, progress.total);
//!     });
//!
//! let result = builder.run();
//! if !result.success {
//!     eprintln!("{:?} failed: {:?}", result.failed_task, result.error_info);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assignment;
pub mod builder;
pub mod context;
pub mod encryption;
pub mod error;
pub mod generator;
pub mod graph;
pub mod packager;
pub mod parameters;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod tasks;

// Re-export main types
pub use assignment::{BuildMap, BundleAssignment};
pub use builder::{AssetBundleBuilder, BuildResult};
pub use context::{BuildContext, ContextKind, ContextObject};
pub use encryption::{EncryptOutcome, EncryptionServices, FileOffsetEncryption, NoEncryption};
pub use error::{Error, Result};
pub use generator::create_manifest;
pub use graph::{AssetGraph, AssetId, BuildAsset};
pub use packager::{ArchivePackager, LegacyPackager, PackagerReport, ScriptablePackager};
pub use parameters::{BuildParameters, CopyBuildinOption, EncryptionKind, PipelineKind};
pub use pipeline::BuildPipeline;
pub use progress::BuildProgress;
pub use report::BuildReport;
pub use tasks::{ManifestContext, PackageContext};

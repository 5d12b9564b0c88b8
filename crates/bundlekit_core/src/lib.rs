//! Core shared types for the bundlekit asset bundle pipeline.
//!
//! This crate holds the pieces that both the collector (`bundlekit_collect`)
//! and the build pipeline (`bundlekit_build`) agree on:
//!
//! - The [`CollectedAsset`] record a collector hands to the pipeline
//! - The [`AssetCollector`] and [`DependencyProvider`] contracts
//! - Bundle name normalization and file digests used for output naming

mod asset;
mod error;
pub mod hash;
pub mod naming;

pub use asset::{
    AssetCollector, BuildMode, CollectResult, CollectedAsset, CollectorKind, DependencyProvider,
};
pub use error::{Error, Result};

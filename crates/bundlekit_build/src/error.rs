//! Error types for the build pipeline.
//!
//! All fallible functions in this crate return [`Result<T>`]. The pipeline
//! runner stops at the first error and reports it together with the name of
//! the failing task (see [`BuildResult`](crate::BuildResult)).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a package.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed without a specific path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem I/O failed on a known path (copy, hash, delete).
    #[error("IO error at '{path}': {source}")]
    IoAt {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive format error: {0}")]
    Archive(#[from] binrw::Error),

    /// The collector failed.
    #[error(transparent)]
    Collect(#[from] bundlekit_core::Error),

    #[error(transparent)]
    Manifest(#[from] bundlekit_manifest::ManifestError),

    // Configuration errors
    #[error("Package name is empty")]
    EmptyPackageName,

    #[error("Package version is empty")]
    EmptyPackageVersion,

    #[error("Invalid package name '{0}': only letters, digits, '_' and '-' are allowed")]
    InvalidPackageName(String),

    #[error("Invalid package version '{0}': must be a single directory name other than '.', '..' or 'OutputCache'")]
    InvalidPackageVersion(String),

    #[error("Missing required build parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Asset '{0}' was collected without a bundle name")]
    MissingBundleName(String),

    #[error("Duplicate address '{address}' used by '{first}' and '{second}'")]
    DuplicateAddress {
        address: String,
        first: String,
        second: String,
    },

    #[error("Asset '{path}' collected into both '{first}' and '{second}'")]
    BundleCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("Raw file '{dependency}' cannot be a dependency of '{asset}'")]
    RawAssetDepended { asset: String, dependency: String },

    #[error("Raw bundle '{bundle}' must contain exactly one asset, found {count}")]
    RawBundleMemberCount { bundle: String, count: usize },

    #[error("Raw file '{0}' cannot be placed in a shared bundle")]
    RawAssetShared(String),

    // Graph invariant violations
    #[error("Dependencies of '{0}' were already set")]
    DependenciesAlreadySet(String),

    #[error("Asset not found in build graph: {0}")]
    AssetNotFound(String),

    #[error("Bundle not found in build map: {0}")]
    BundleNotFound(String),

    #[error("Build context already holds a {0}")]
    ContextAlreadySet(&'static str),

    #[error("Build context has no {0}")]
    ContextMissing(&'static str),

    // External stage failures
    #[error("Packager failed: {0}")]
    Packager(String),

    #[error("Packager did not produce bundle '{bundle}'")]
    MissingOutput { bundle: String },

    #[error("Packager produced unexpected bundle '{0}'")]
    UnexpectedOutput(String),

    #[error("Encryption of '{bundle}' failed: {message}")]
    Encryption { bundle: String, message: String },

    /// Zstd compression or decompression failed.
    #[error("Compression error: {0}")]
    Compression(String),
}

impl Error {
    /// Build a mapper attaching `path` to an I/O error, for use with `map_err`.
    pub fn io_at(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::IoAt { path, source }
    }
}

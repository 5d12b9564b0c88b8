//! Error types for asset collection.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while collecting assets or resolving their dependencies.
///
/// Every variant except [`Io`](Error::Io) is a configuration error: the build
/// aborts before any output is written.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two main assets resolved to the same address while addressable mode is enabled.
    #[error("Duplicate address '{address}' used by '{first}' and '{second}'")]
    DuplicateAddress {
        address: String,
        first: String,
        second: String,
    },

    /// The same asset was collected twice with different bundle names.
    #[error("Asset '{path}' collected into both '{first}' and '{second}'")]
    BundleCollision {
        path: String,
        first: String,
        second: String,
    },

    /// A rule name in the settings file has no registered implementation.
    #[error("Unknown {kind} rule: {name}")]
    UnknownRule { kind: &'static str, name: String },

    /// The requested package does not exist in the collector settings.
    #[error("Package not found in collector settings: {0}")]
    PackageNotFound(String),

    /// A collect path points at nothing on disk.
    #[error("Collect path not found: {0}")]
    CollectPathNotFound(Utf8PathBuf),

    /// Catch-all for malformed settings.
    #[error("Invalid collector settings: {0}")]
    InvalidSettings(String),
}

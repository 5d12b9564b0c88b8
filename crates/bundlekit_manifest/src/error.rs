use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("io error")]
    IoError(#[from] io::Error),

    #[error("binrw error")]
    BinRwError(#[from] binrw::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid utf-8 string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid magic: {0:#x}")]
    InvalidMagic(u32),

    #[error("unsupported manifest version: {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },

    #[error("unsupported manifest file: {0}")]
    UnsupportedFile(String),

    #[error("{owner} references bundle id {id}, but only {count} bundles exist")]
    BundleIdOutOfRange { owner: String, id: u32, count: usize },

    #[error("bundle '{0}' references itself")]
    SelfReference(String),

    #[error("asset '{0}' lists its own bundle as a dependency")]
    SelfDependency(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

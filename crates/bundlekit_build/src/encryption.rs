//! Pluggable bundle encryption.
//!
//! The pipeline hands every bundle file to an [`EncryptionServices`]
//! implementation. A service either leaves the bundle alone or returns the
//! transformed bytes and the [`LoadMethod`] the runtime must use to open them.

use crate::error::Result;
use crate::parameters::EncryptionKind;
use bundlekit_manifest::LoadMethod;
use std::sync::Arc;

/// What an encryption service did with one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptOutcome {
    /// The bundle file is used as-is with [`LoadMethod::Normal`].
    Unchanged,
    Encrypted { data: Vec<u8>, load_method: LoadMethod },
}

/// Contract for bundle encryption.
pub trait EncryptionServices: Send + Sync {
    fn encrypt(&self, bundle_name: &str, data: &[u8]) -> Result<EncryptOutcome>;
}

/// Leaves every bundle untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncryption;

impl EncryptionServices for NoEncryption {
    fn encrypt(&self, _bundle_name: &str, _data: &[u8]) -> Result<EncryptOutcome> {
        Ok(EncryptOutcome::Unchanged)
    }
}

/// Prefixes every bundle with a block of zero bytes.
///
/// The runtime opens the file at `offset`, which defeats tools that expect a
/// bundle header at position zero.
#[derive(Debug, Clone, Copy)]
pub struct FileOffsetEncryption {
    pub offset: usize,
}

impl Default for FileOffsetEncryption {
    fn default() -> Self {
        Self { offset: 32 }
    }
}

impl EncryptionServices for FileOffsetEncryption {
    fn encrypt(&self, _bundle_name: &str, data: &[u8]) -> Result<EncryptOutcome> {
        let mut encrypted = vec![0u8; self.offset];
        encrypted.extend_from_slice(data);
        Ok(EncryptOutcome::Encrypted {
            data: encrypted,
            load_method: LoadMethod::LoadFromFileOffset,
        })
    }
}

/// The built-in service for a configured [`EncryptionKind`].
pub fn services_for(kind: EncryptionKind) -> Arc<dyn EncryptionServices> {
    match kind {
        EncryptionKind::None => Arc::new(NoEncryption),
        EncryptionKind::FileOffset => Arc::new(FileOffsetEncryption::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_encryption() {
        let outcome = services_for(EncryptionKind::None)
            .encrypt("a.bundle", b"data")
            .unwrap();
        assert_eq!(outcome, EncryptOutcome::Unchanged);
    }

    #[test]
    fn test_file_offset() {
        let outcome = FileOffsetEncryption { offset: 4 }
            .encrypt("a.bundle", b"data")
            .unwrap();
        assert_eq!(
            outcome,
            EncryptOutcome::Encrypted {
                data: b"\0\0\0\0data".to_vec(),
                load_method: LoadMethod::LoadFromFileOffset,
            }
        );
    }
}

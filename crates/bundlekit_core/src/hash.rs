//! File digests used for output naming, verification and incremental builds.

use camino::Utf8Path;
use md5::{Digest, Md5};
use std::io::Read;
use xxhash_rust::xxh3::Xxh3;

/// File hash reported for every bundle when no real output exists.
pub const ZERO_HASH: &str = "00000000000000000000000000000000";

/// CRC reported for every bundle when no real output exists.
pub const ZERO_CRC: u32 = 0;

/// MD5 hex, CRC32 and size of one file, computed in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub md5: String,
    pub crc: u32,
    pub size: u64,
}

impl FileDigest {
    /// The dry-run sentinel: all-zero hash, zero CRC, zero size.
    pub fn sentinel() -> Self {
        Self {
            md5: ZERO_HASH.to_string(),
            crc: ZERO_CRC,
            size: 0,
        }
    }
}

/// Hash a byte buffer with MD5, returned as lowercase hex.
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// CRC32 (IEEE) of a byte buffer.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Digest a file on disk without loading it whole.
pub fn digest_file(path: &Utf8Path) -> std::io::Result<FileDigest> {
    let mut file = std::fs::File::open(path.as_std_path())?;
    let mut md5 = Md5::new();
    let mut crc = crc32fast::Hasher::new();
    let mut size = 0u64;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        md5.update(&buf[..read]);
        crc.update(&buf[..read]);
        size += read as u64;
    }

    Ok(FileDigest {
        md5: hex::encode(md5.finalize()),
        crc: crc.finalize(),
        size,
    })
}

/// Order-sensitive content fingerprint over named parts, as 16 hex digits.
///
/// Each part contributes its name and bytes, length-prefixed so that
/// `("ab", "c")` and `("a", "bc")` hash differently.
pub fn content_hash<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut hasher = Xxh3::new();
    for (name, bytes) in parts {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    format!("{:016x}", hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_crc32_known_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_digest_file_matches_buffer_digest() {
        let mut temp = NamedTempFile::new().unwrap();
        let data = b"bundle payload".repeat(10_000);
        temp.write_all(&data).unwrap();
        temp.flush().unwrap();

        let path = Utf8Path::from_path(temp.path()).unwrap();
        let digest = digest_file(path).unwrap();

        assert_eq!(digest.md5, md5_hex(&data));
        assert_eq!(digest.crc, crc32(&data));
        assert_eq!(digest.size, data.len() as u64);
    }

    #[test]
    fn test_sentinel() {
        let sentinel = FileDigest::sentinel();
        assert_eq!(sentinel.md5.len(), 32);
        assert!(sentinel.md5.chars().all(|c| c == '0'));
        assert_eq!(sentinel.crc, 0);
        assert_eq!(sentinel.size, 0);
    }

    #[test]
    fn test_content_hash_boundaries() {
        let a = content_hash([("ab", &b"c"[..])]);
        let b = content_hash([("a", &b"bc"[..])]);
        assert_ne!(a, b);
        assert_eq!(a, content_hash([("ab", &b"c"[..])]));
        assert_eq!(a.len(), 16);
    }
}

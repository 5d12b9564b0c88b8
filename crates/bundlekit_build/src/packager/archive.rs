//! The bundled reference packager.
//!
//! Every bundle becomes one `BKAR` archive: a header holding the bundle's
//! content hash and an entry table, followed by each asset's bytes
//! compressed with zstd. Entries are sorted by path so the same inputs
//! always yield the same file.
//!
//! Assets without a bundle of their own are folded into the bundles whose
//! members depend on them. A dependency owned by another bundle makes that
//! bundle a direct dependency of the archive.

use super::{
    BundleBuild, LegacyBuildOutput, LegacyPackager, PackagerRequest, ScriptableBuildOutput,
    ScriptableBundleDetails, ScriptablePackager,
};
use crate::error::{Error, Result};
use binrw::{binrw, BinRead, BinWrite};
use bundlekit_core::hash::{content_hash, crc32, md5_hex};
use bundlekit_core::BuildMode;
use camino::Utf8Path;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, Cursor};
use xxhash_rust::xxh3::xxh3_64;

pub const ARCHIVE_VERSION: u32 = 1;

#[binrw]
#[brw(little, magic = b"BKAR")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub version: u32,

    #[br(temp)]
    #[bw(calc = content_hash.len() as u32)]
    content_hash_len: u32,
    #[br(count = content_hash_len, try_map = String::from_utf8)]
    #[bw(map = |s: &String| s.as_bytes().to_vec())]
    pub content_hash: String,

    #[br(temp)]
    #[bw(calc = entries.len() as u32)]
    entry_count: u32,
    #[br(count = entry_count)]
    pub entries: Vec<ArchiveEntry>,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveEntry {
    #[br(temp)]
    #[bw(calc = path.len() as u32)]
    path_len: u32,
    #[br(count = path_len, try_map = String::from_utf8)]
    #[bw(map = |s: &String| s.as_bytes().to_vec())]
    pub path: String,

    pub data_offset: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,

    /// xxh3 of the uncompressed bytes.
    pub checksum: u64,
}

/// Writes one zstd-compressed archive per bundle.
#[derive(Debug, Clone)]
pub struct ArchivePackager {
    compression_level: i32,
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// Result of packing one bundle.
#[derive(Debug, Clone)]
struct PackedBundle {
    bundle_name: String,
    hash: String,
    crc: u32,
    dependencies: Vec<String>,
}

impl ArchivePackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    fn pack_all(&self, request: &PackagerRequest) -> Result<Vec<PackedBundle>> {
        if !request.dry_run() {
            std::fs::create_dir_all(&request.output_dir)
                .map_err(Error::io_at(&request.output_dir))?;
        }

        let owners = request.owners();

        tracing::info!(
            "Packing bundles count={} output={} mode={}",
            request.bundles.len(),
            request.output_dir,
            request.build_mode
        );

        request
            .bundles
            .par_iter()
            .map(|bundle| {
                if bundle.is_raw {
                    self.copy_raw(request, bundle)
                } else {
                    self.pack_bundle(request, &owners, bundle)
                }
            })
            .collect()
    }

    fn pack_bundle(
        &self,
        request: &PackagerRequest,
        owners: &BTreeMap<&str, &str>,
        bundle: &BundleBuild,
    ) -> Result<PackedBundle> {
        let mut contents: BTreeSet<&str> = BTreeSet::new();
        let mut dependencies: BTreeSet<&str> = BTreeSet::new();

        for member in &bundle.asset_paths {
            contents.insert(member);
            let Some(deps) = request.asset_dependencies.get(member) else {
                continue;
            };
            for dep in deps {
                match owners.get(dep.as_str()) {
                    Some(&owner) if owner != bundle.bundle_name => {
                        dependencies.insert(owner);
                    }
                    Some(_) => {}
                    None => {
                        contents.insert(dep);
                    }
                }
            }
        }

        let files = contents
            .iter()
            .map(|&path| {
                read_source(&request.project_root, path, &bundle.bundle_name).map(|data| (path, data))
            })
            .collect::<Result<Vec<_>>>()?;

        let hash = content_hash(files.iter().map(|(path, data)| (*path, data.as_slice())));
        let dependencies: Vec<String> = dependencies.into_iter().map(str::to_string).collect();

        if request.dry_run() {
            return Ok(PackedBundle {
                bundle_name: bundle.bundle_name.clone(),
                hash,
                crc: 0,
                dependencies,
            });
        }

        let archive_path = request.output_dir.join(&bundle.bundle_name);
        if request.build_mode == BuildMode::IncrementalBuild {
            if let Some(crc) = reusable_archive(&archive_path, &hash) {
                tracing::debug!("Reusing archive bundle={} hash={}", bundle.bundle_name, hash);
                return Ok(PackedBundle {
                    bundle_name: bundle.bundle_name.clone(),
                    hash,
                    crc,
                    dependencies,
                });
            }
        }

        let bytes = self.encode_archive(&hash, &files)?;
        std::fs::write(&archive_path, &bytes).map_err(Error::io_at(&archive_path))?;

        tracing::debug!(
            "Packed bundle={} files={} size={}",
            bundle.bundle_name,
            files.len(),
            bytes.len()
        );

        Ok(PackedBundle {
            bundle_name: bundle.bundle_name.clone(),
            hash,
            crc: crc32(&bytes),
            dependencies,
        })
    }

    fn copy_raw(&self, request: &PackagerRequest, bundle: &BundleBuild) -> Result<PackedBundle> {
        let [source] = bundle.asset_paths.as_slice() else {
            return Err(Error::RawBundleMemberCount {
                bundle: bundle.bundle_name.clone(),
                count: bundle.asset_paths.len(),
            });
        };

        let data = read_source(&request.project_root, source, &bundle.bundle_name)?;
        let crc = if request.dry_run() {
            0
        } else {
            let target = request.output_dir.join(&bundle.bundle_name);
            std::fs::write(&target, &data).map_err(Error::io_at(&target))?;
            crc32(&data)
        };

        Ok(PackedBundle {
            bundle_name: bundle.bundle_name.clone(),
            hash: md5_hex(&data),
            crc,
            dependencies: Vec::new(),
        })
    }

    fn encode_archive(&self, hash: &str, files: &[(&str, Vec<u8>)]) -> Result<Vec<u8>> {
        let compressed = files
            .iter()
            .map(|(_, data)| {
                zstd::bulk::compress(data, self.compression_level)
                    .map_err(|e| Error::Compression(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut header = ArchiveHeader {
            version: ARCHIVE_VERSION,
            content_hash: hash.to_string(),
            entries: files
                .iter()
                .zip(&compressed)
                .map(|((path, data), packed)| ArchiveEntry {
                    path: path.to_string(),
                    data_offset: 0,
                    compressed_size: packed.len() as u64,
                    uncompressed_size: data.len() as u64,
                    checksum: xxh3_64(data),
                })
                .collect(),
        };

        // Offsets are fixed width, so the header size does not depend on them.
        let mut sizing = Cursor::new(Vec::new());
        header.write(&mut sizing)?;
        let mut offset = sizing.into_inner().len() as u64;
        for entry in &mut header.entries {
            entry.data_offset = offset;
            offset += entry.compressed_size;
        }

        let mut writer = Cursor::new(Vec::with_capacity(offset as usize));
        header.write(&mut writer)?;
        let mut bytes = writer.into_inner();
        for packed in &compressed {
            bytes.extend_from_slice(packed);
        }
        Ok(bytes)
    }
}

impl ScriptablePackager for ArchivePackager {
    fn build(&self, request: &PackagerRequest) -> Result<ScriptableBuildOutput> {
        let bundles = self
            .pack_all(request)?
            .into_iter()
            .map(|packed| {
                (
                    packed.bundle_name,
                    ScriptableBundleDetails {
                        hash: packed.hash,
                        crc: packed.crc,
                        dependencies: packed.dependencies,
                    },
                )
            })
            .collect();
        Ok(ScriptableBuildOutput { bundles })
    }
}

impl LegacyPackager for ArchivePackager {
    fn build(&self, request: &PackagerRequest) -> Result<LegacyBuildOutput> {
        if let Some(raw) = request.bundles.iter().find(|b| b.is_raw) {
            return Err(Error::Packager(format!(
                "raw bundle '{}' cannot be packed by the legacy packager",
                raw.bundle_name
            )));
        }

        let mut output = LegacyBuildOutput::default();
        for packed in self.pack_all(request)? {
            output
                .bundle_hashes
                .insert(packed.bundle_name.clone(), packed.hash);
            output
                .dependencies
                .insert(packed.bundle_name, packed.dependencies);
        }
        Ok(output)
    }
}

/// Read the header of an archive written by [`ArchivePackager`].
pub fn read_archive_header(path: &Utf8Path) -> Result<ArchiveHeader> {
    let file = std::fs::File::open(path).map_err(Error::io_at(path))?;
    Ok(ArchiveHeader::read(&mut BufReader::new(file))?)
}

/// Read every entry of an archive, decompressed and checksum-verified.
pub fn read_archive(path: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let bytes = std::fs::read(path).map_err(Error::io_at(path))?;
    let header = ArchiveHeader::read(&mut Cursor::new(&bytes))?;

    let mut files = BTreeMap::new();
    for entry in header.entries {
        let start = entry.data_offset as usize;
        let packed = start
            .checked_add(entry.compressed_size as usize)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| {
                Error::Packager(format!("entry '{}' lies outside of {}", entry.path, path))
            })?;
        let data = zstd::bulk::decompress(packed, entry.uncompressed_size as usize)
            .map_err(|e| Error::Compression(e.to_string()))?;
        if xxh3_64(&data) != entry.checksum {
            return Err(Error::Packager(format!(
                "checksum mismatch for entry '{}' in {}",
                entry.path, path
            )));
        }
        files.insert(entry.path, data);
    }
    Ok(files)
}

/// CRC of an existing archive whose stored hash equals `hash`.
fn reusable_archive(path: &Utf8Path, hash: &str) -> Option<u32> {
    let bytes = std::fs::read(path).ok()?;
    let header = ArchiveHeader::read(&mut Cursor::new(&bytes)).ok()?;
    (header.content_hash == hash).then(|| crc32(&bytes))
}

fn read_source(project_root: &Utf8Path, path: &str, bundle_name: &str) -> Result<Vec<u8>> {
    let full = project_root.join(path);
    std::fs::read(&full).map_err(|e| {
        Error::Packager(format!(
            "cannot read '{}' for bundle '{}': {}",
            full, bundle_name, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packager::PackagerReport;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for (path, data) in [
            ("x.prefab", "x prefab"),
            ("x.mat", "x material"),
            ("y.prefab", "y prefab"),
            ("e.png", "shared texture"),
            ("intro.mp4", "video bytes"),
        ] {
            std::fs::write(root.join(path), data).unwrap();
        }
        (dir, root)
    }

    fn request(root: &Utf8Path, mode: BuildMode) -> PackagerRequest {
        PackagerRequest {
            project_root: root.to_path_buf(),
            output_dir: root.join("out"),
            build_mode: mode,
            bundles: vec![
                BundleBuild {
                    bundle_name: "x.bundle".to_string(),
                    asset_paths: vec!["x.prefab".to_string()],
                    is_raw: false,
                },
                BundleBuild {
                    bundle_name: "y.bundle".to_string(),
                    asset_paths: vec!["y.prefab".to_string()],
                    is_raw: false,
                },
                BundleBuild {
                    bundle_name: "share_e.bundle".to_string(),
                    asset_paths: vec!["e.png".to_string()],
                    is_raw: false,
                },
            ],
            asset_dependencies: BTreeMap::from([
                (
                    "x.prefab".to_string(),
                    vec!["e.png".to_string(), "x.mat".to_string()],
                ),
                ("y.prefab".to_string(), vec!["e.png".to_string()]),
            ]),
        }
    }

    #[test]
    fn test_packs_and_folds() {
        let (_dir, root) = project();
        let request = request(&root, BuildMode::ForceRebuild);

        let output = ScriptablePackager::build(&ArchivePackager::new(), &request).unwrap();
        assert_eq!(
            output.direct_dependencies("x.bundle"),
            &["share_e.bundle".to_string()]
        );
        assert!(output.direct_dependencies("share_e.bundle").is_empty());

        let files = read_archive(&root.join("out/x.bundle")).unwrap();
        assert_eq!(
            files.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["x.mat", "x.prefab"]
        );
        assert_eq!(files["x.mat"], b"x material");

        let header = read_archive_header(&root.join("out/x.bundle")).unwrap();
        assert_eq!(Some(header.content_hash.as_str()), output.content_hash("x.bundle"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let (_dir, root) = project();
        let packager = ArchivePackager::new();

        ScriptablePackager::build(&packager, &request(&root, BuildMode::ForceRebuild)).unwrap();
        let first = std::fs::read(root.join("out/x.bundle")).unwrap();

        ScriptablePackager::build(&packager, &request(&root, BuildMode::ForceRebuild)).unwrap();
        let second = std::fs::read(root.join("out/x.bundle")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_incremental_reuses_unchanged_archive() {
        let (_dir, root) = project();
        let packager = ArchivePackager::new();

        let first =
            ScriptablePackager::build(&packager, &request(&root, BuildMode::ForceRebuild)).unwrap();
        let second =
            ScriptablePackager::build(&packager, &request(&root, BuildMode::IncrementalBuild))
                .unwrap();
        assert_eq!(first, second);

        std::fs::write(root.join("x.mat"), "changed material").unwrap();
        let third =
            ScriptablePackager::build(&packager, &request(&root, BuildMode::IncrementalBuild))
                .unwrap();
        assert_ne!(first.bundles["x.bundle"].hash, third.bundles["x.bundle"].hash);
        assert_eq!(first.bundles["y.bundle"], third.bundles["y.bundle"]);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (_dir, root) = project();
        let output =
            ScriptablePackager::build(&ArchivePackager::new(), &request(&root, BuildMode::DryRunBuild))
                .unwrap();
        assert_eq!(output.bundles.len(), 3);
        assert!(output.bundles.values().all(|b| b.crc == 0));
        assert!(!root.join("out").exists());
    }

    #[test]
    fn test_raw_bundles() {
        let (_dir, root) = project();
        let mut request = request(&root, BuildMode::ForceRebuild);
        request.bundles.push(BundleBuild {
            bundle_name: "intro.rawfile".to_string(),
            asset_paths: vec!["intro.mp4".to_string()],
            is_raw: true,
        });

        assert!(matches!(
            LegacyPackager::build(&ArchivePackager::new(), &request),
            Err(Error::Packager(_))
        ));

        let output = ScriptablePackager::build(&ArchivePackager::new(), &request).unwrap();
        assert_eq!(
            std::fs::read(root.join("out/intro.rawfile")).unwrap(),
            b"video bytes"
        );
        assert_eq!(output.bundles["intro.rawfile"].hash, md5_hex(b"video bytes"));
    }

    #[test]
    fn test_missing_source() {
        let (_dir, root) = project();
        std::fs::remove_file(root.join("e.png")).unwrap();
        assert!(matches!(
            ScriptablePackager::build(&ArchivePackager::new(), &request(&root, BuildMode::ForceRebuild)),
            Err(Error::Packager(message)) if message.contains("share_e.bundle")
        ));
    }

    #[test]
    fn test_corrupt_entry_range() {
        let (_dir, root) = project();
        let header = ArchiveHeader {
            version: ARCHIVE_VERSION,
            content_hash: "0".repeat(16),
            entries: vec![ArchiveEntry {
                path: "a.prefab".to_string(),
                data_offset: u64::MAX - 1,
                compressed_size: 8,
                uncompressed_size: 8,
                checksum: 0,
            }],
        };
        let mut bytes = Cursor::new(Vec::new());
        header.write(&mut bytes).unwrap();
        let path = root.join("corrupt.bundle");
        std::fs::write(&path, bytes.into_inner()).unwrap();

        assert!(matches!(
            read_archive(&path),
            Err(Error::Packager(message)) if message.contains("a.prefab")
        ));
    }
}

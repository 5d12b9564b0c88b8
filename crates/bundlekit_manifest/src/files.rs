//! Manifest files inside a package output directory.
//!
//! For package `P` at version `V` the directory holds:
//!
//! - `PackageManifest_P_V.bytes` (binary manifest)
//! - `PackageManifest_P_V.json` (JSON mirror)
//! - `PackageManifest_P_V.hash` (MD5 of the `.bytes` file)
//! - `PackageManifest_P.version` (the version string)

use camino::{Utf8Path, Utf8PathBuf};

use crate::{ManifestError, PatchManifest, Result};

pub const MANIFEST_FILE_PREFIX: &str = "PackageManifest";

pub fn manifest_bytes_file_name(package_name: &str, package_version: &str) -> String {
    format!("{}_{}_{}.bytes", MANIFEST_FILE_PREFIX, package_name, package_version)
}

pub fn manifest_json_file_name(package_name: &str, package_version: &str) -> String {
    format!("{}_{}_{}.json", MANIFEST_FILE_PREFIX, package_name, package_version)
}

pub fn package_hash_file_name(package_name: &str, package_version: &str) -> String {
    format!("{}_{}_{}.hash", MANIFEST_FILE_PREFIX, package_name, package_version)
}

pub fn package_version_file_name(package_name: &str) -> String {
    format!("{}_{}.version", MANIFEST_FILE_PREFIX, package_name)
}

/// Paths of the manifest files written for one package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFiles {
    pub bytes: Utf8PathBuf,
    pub json: Utf8PathBuf,
    pub hash: Utf8PathBuf,

    /// MD5 of the binary manifest, as written to the hash file.
    pub package_hash: String,
}

/// Write the binary manifest, its JSON mirror and the package hash file.
///
/// The version file is written separately with [`write_version_file`] so the
/// caller can make it the last file to appear.
pub fn write_manifest_files(dir: &Utf8Path, manifest: &PatchManifest) -> Result<ManifestFiles> {
    std::fs::create_dir_all(dir.as_std_path())?;

    let package = &manifest.package_name;
    let version = &manifest.package_version;

    let bytes = manifest.to_bytes()?;
    let bytes_path = dir.join(manifest_bytes_file_name(package, version));
    std::fs::write(bytes_path.as_std_path(), &bytes)?;

    let json_path = dir.join(manifest_json_file_name(package, version));
    std::fs::write(json_path.as_std_path(), manifest.to_json()?)?;

    let package_hash = bundlekit_core::hash::md5_hex(&bytes);
    let hash_path = dir.join(package_hash_file_name(package, version));
    std::fs::write(hash_path.as_std_path(), format!("{}\n", package_hash))?;

    tracing::debug!(
        "Wrote manifest package={} version={} bundles={} assets={} hash={}",
        package,
        version,
        manifest.bundle_list.len(),
        manifest.asset_list.len(),
        package_hash
    );

    Ok(ManifestFiles {
        bytes: bytes_path,
        json: json_path,
        hash: hash_path,
        package_hash,
    })
}

/// Write the package version file.
pub fn write_version_file(
    dir: &Utf8Path,
    package_name: &str,
    package_version: &str,
) -> Result<Utf8PathBuf> {
    std::fs::create_dir_all(dir.as_std_path())?;
    let path = dir.join(package_version_file_name(package_name));
    std::fs::write(path.as_std_path(), package_version)?;
    Ok(path)
}

pub fn read_version_file(path: &Utf8Path) -> Result<String> {
    Ok(std::fs::read_to_string(path.as_std_path())?.trim().to_string())
}

pub fn read_hash_file(path: &Utf8Path) -> Result<String> {
    Ok(std::fs::read_to_string(path.as_std_path())?.trim().to_string())
}

/// Load a manifest from a `.bytes` or `.json` file, chosen by extension.
pub fn load_manifest(path: &Utf8Path) -> Result<PatchManifest> {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("bytes") => PatchManifest::from_bytes(&std::fs::read(path.as_std_path())?),
        Some("json") => PatchManifest::from_json(&std::fs::read_to_string(path.as_std_path())?),
        _ => Err(ManifestError::UnsupportedFile(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::create_example_manifest;

    #[test]
    fn test_file_names() {
        assert_eq!(
            manifest_bytes_file_name("DefaultPackage", "v1"),
            "PackageManifest_DefaultPackage_v1.bytes"
        );
        assert_eq!(
            package_hash_file_name("DefaultPackage", "v1"),
            "PackageManifest_DefaultPackage_v1.hash"
        );
        assert_eq!(
            package_version_file_name("DefaultPackage"),
            "PackageManifest_DefaultPackage.version"
        );
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let manifest = create_example_manifest();

        let files = write_manifest_files(dir, &manifest).unwrap();
        let version = write_version_file(dir, "DefaultPackage", "2024-06-01").unwrap();

        let bytes = std::fs::read(&files.bytes).unwrap();
        assert_eq!(
            read_hash_file(&files.hash).unwrap(),
            bundlekit_core::hash::md5_hex(&bytes)
        );
        assert_eq!(read_version_file(&version).unwrap(), "2024-06-01");

        assert_eq!(load_manifest(&files.bytes).unwrap(), manifest);
        assert_eq!(load_manifest(&files.json).unwrap(), manifest);
        assert!(matches!(
            load_manifest(&files.hash),
            Err(ManifestError::UnsupportedFile(_))
        ));
    }
}

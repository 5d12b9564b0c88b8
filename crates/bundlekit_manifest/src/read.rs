use binrw::BinRead;
use byteorder::{ReadBytesExt, LE};
use std::io::{self, BufReader, Read, Seek};

use crate::{
    LoadMethod, ManifestError, OutputNameStyle, PatchAsset, PatchBundle, PatchManifest, Result,
    MANIFEST_FILE_VERSION, MANIFEST_MAGIC,
};

impl PatchManifest {
    /// Read a binary manifest written by [`PatchManifest::write_to`].
    ///
    /// Fails on a foreign magic or a different format version.
    pub fn read_from<R: Read + Seek>(source: &mut R) -> Result<Self> {
        let mut reader = BufReader::new(source);

        let magic = reader.read_u32::<LE>()?;
        if magic != u32::from_le_bytes(MANIFEST_MAGIC) {
            return Err(ManifestError::InvalidMagic(magic));
        }

        let file_version = read_string(&mut reader)?;
        if file_version != MANIFEST_FILE_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: file_version,
                expected: MANIFEST_FILE_VERSION.to_string(),
            });
        }

        let enable_addressable = reader.read_u8()? != 0;
        let output_name_style = OutputNameStyle::read(&mut reader)?;
        let package_name = read_string(&mut reader)?;
        let package_version = read_string(&mut reader)?;

        let bundle_count = reader.read_u32::<LE>()?;
        let mut bundle_list = Vec::with_capacity(bundle_count.min(4096) as usize);
        for _ in 0..bundle_count {
            bundle_list.push(read_bundle(&mut reader)?);
        }

        let asset_count = reader.read_u32::<LE>()?;
        let mut asset_list = Vec::with_capacity(asset_count.min(4096) as usize);
        for _ in 0..asset_count {
            asset_list.push(read_asset(&mut reader)?);
        }

        Ok(Self {
            file_version,
            enable_addressable,
            output_name_style,
            package_name,
            package_version,
            bundle_list,
            asset_list,
        })
    }

    /// Decode a binary manifest from a buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut io::Cursor::new(bytes))
    }
}

fn read_bundle<R: Read + Seek>(reader: &mut R) -> Result<PatchBundle> {
    Ok(PatchBundle {
        bundle_name: read_string(reader)?,
        file_hash: read_string(reader)?,
        file_crc: reader.read_u32::<LE>()?,
        file_size: reader.read_u64::<LE>()?,
        is_raw_file: reader.read_u8()? != 0,
        load_method: LoadMethod::read(reader)?,
        tags: read_strings(reader)?,
        reference_ids: read_ids(reader)?,
    })
}

fn read_asset<R: Read>(reader: &mut R) -> Result<PatchAsset> {
    Ok(PatchAsset {
        address: read_string(reader)?,
        asset_path: read_string(reader)?,
        asset_tags: read_strings(reader)?,
        bundle_id: reader.read_u32::<LE>()?,
        depend_ids: read_ids(reader)?,
    })
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LE>()? as u64;
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(String::from_utf8(buf)?)
}

fn read_strings<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let count = reader.read_u32::<LE>()?;
    (0..count).map(|_| read_string(reader)).collect()
}

fn read_ids<R: Read>(reader: &mut R) -> Result<Vec<u32>> {
    let count = reader.read_u32::<LE>()?;
    (0..count)
        .map(|_| reader.read_u32::<LE>().map_err(ManifestError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::create_example_manifest;

    #[test]
    fn test_binary_matches_json_content() {
        let manifest = create_example_manifest();
        let bytes = manifest.to_bytes().unwrap();
        let from_binary = PatchManifest::from_bytes(&bytes).unwrap();
        let from_json = PatchManifest::from_json(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(from_binary, manifest);
        assert_eq!(from_binary, from_json);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let manifest = create_example_manifest();
        assert_eq!(manifest.to_bytes().unwrap(), manifest.clone().to_bytes().unwrap());
    }

    #[test]
    fn test_header_layout() {
        let bytes = PatchManifest::new("pkg", "v1").to_bytes().unwrap();

        assert_eq!(&bytes[0..4], b"BKMF");
        assert_eq!(&bytes[4..8], &(MANIFEST_FILE_VERSION.len() as u32).to_le_bytes());
        assert_eq!(&bytes[8..8 + MANIFEST_FILE_VERSION.len()], MANIFEST_FILE_VERSION.as_bytes());
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = create_example_manifest().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            PatchManifest::from_bytes(&bytes),
            Err(ManifestError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut manifest = create_example_manifest();
        manifest.file_version = "0.9.0".to_string();
        let bytes = manifest.to_bytes().unwrap();

        assert!(matches!(
            PatchManifest::from_bytes(&bytes),
            Err(ManifestError::UnsupportedVersion { found, .. }) if found == "0.9.0"
        ));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = create_example_manifest().to_bytes().unwrap();
        assert!(PatchManifest::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}

use binrw::BinWrite;
use byteorder::{WriteBytesExt, LE};
use std::io::{self, BufWriter, Seek, Write};

use crate::{PatchAsset, PatchBundle, PatchManifest, Result, MANIFEST_MAGIC};

impl PatchManifest {
    /// Write the binary manifest.
    ///
    /// Layout (all integers little-endian, strings are a `u32` byte length
    /// followed by UTF-8 bytes):
    ///
    /// ```text
    /// magic "BKMF" | file_version | enable_addressable: u8 | output_name_style: u8
    /// package_name | package_version
    /// bundle_count: u32 | bundles...
    /// asset_count: u32  | assets...
    /// ```
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let mut writer = BufWriter::new(writer);

        writer.write_all(&MANIFEST_MAGIC)?;
        write_string(&mut writer, &self.file_version)?;
        writer.write_u8(self.enable_addressable as u8)?;
        self.output_name_style.write(&mut writer)?;
        write_string(&mut writer, &self.package_name)?;
        write_string(&mut writer, &self.package_version)?;

        writer.write_u32::<LE>(self.bundle_list.len() as u32)?;
        for bundle in &self.bundle_list {
            write_bundle(&mut writer, bundle)?;
        }

        writer.write_u32::<LE>(self.asset_list.len() as u32)?;
        for asset in &self.asset_list {
            write_asset(&mut writer, asset)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Encode the binary manifest into a buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = io::Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

fn write_bundle<W: Write + Seek>(writer: &mut W, bundle: &PatchBundle) -> Result<()> {
    write_string(writer, &bundle.bundle_name)?;
    write_string(writer, &bundle.file_hash)?;
    writer.write_u32::<LE>(bundle.file_crc)?;
    writer.write_u64::<LE>(bundle.file_size)?;
    writer.write_u8(bundle.is_raw_file as u8)?;
    bundle.load_method.write(writer)?;
    write_strings(writer, &bundle.tags)?;
    write_ids(writer, &bundle.reference_ids)?;
    Ok(())
}

fn write_asset<W: Write>(writer: &mut W, asset: &PatchAsset) -> Result<()> {
    write_string(writer, &asset.address)?;
    write_string(writer, &asset.asset_path)?;
    write_strings(writer, &asset.asset_tags)?;
    writer.write_u32::<LE>(asset.bundle_id)?;
    write_ids(writer, &asset.depend_ids)?;
    Ok(())
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    writer.write_u32::<LE>(value.len() as u32)?;
    writer.write_all(value.as_bytes())
}

fn write_strings<W: Write>(writer: &mut W, values: &[String]) -> io::Result<()> {
    writer.write_u32::<LE>(values.len() as u32)?;
    for value in values {
        write_string(writer, value)?;
    }
    Ok(())
}

fn write_ids<W: Write>(writer: &mut W, ids: &[u32]) -> io::Result<()> {
    writer.write_u32::<LE>(ids.len() as u32)?;
    for &id in ids {
        writer.write_u32::<LE>(id)?;
    }
    Ok(())
}

//! Patch an XLSX ZIP archive with replaced and added parts.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression cost).
//! Only replaced parts get new bytes written; new parts are appended.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{CertprintError, Result};

/// Copy `original_data`, swapping in the parts named in `parts`. Names not
/// present in the original are added at the end.
pub(crate) fn patch_zip(
    original_data: &[u8],
    parts: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>> {
    let cursor = Cursor::new(original_data);
    let mut archive = ZipArchive::new(cursor)
        .map_err(|e| CertprintError::malformed("template is not a readable archive", e))?;

    let buf: Vec<u8> = Vec::with_capacity(original_data.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));
    let mut written = Vec::with_capacity(parts.len());

    // Copy all entries, replacing patched ones
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(copy_failed)?;
        let name = entry.name().to_string();

        if let Some(data) = parts.get(&name) {
            drop(entry);
            write_part(&mut writer, &name, data)?;
            written.push(name);
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry).map_err(copy_failed)?;
    }

    for (name, data) in parts {
        if !written.contains(name) {
            write_part(&mut writer, name, data)?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| CertprintError::write_failed("finishing archive", e))?;
    Ok(cursor.into_inner())
}

fn write_part<W: Write + Seek>(writer: &mut ZipWriter<W>, name: &str, data: &[u8]) -> Result<()> {
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer
        .start_file(name, options)
        .map_err(|e| CertprintError::write_failed(&format!("adding {name}"), e))?;
    writer
        .write_all(data)
        .map_err(|e| CertprintError::write_failed(&format!("writing {name}"), e))
}

fn copy_failed(err: ZipError) -> CertprintError {
    CertprintError::write_failed("copying template entry", err)
}

/// Read an entry that may legitimately be absent.
pub(crate) fn read_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(CertprintError::malformed(&format!("opening {name}"), e)),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| CertprintError::malformed(&format!("reading {name}"), e))?;
    Ok(Some(content))
}

//! ROM path resolution: gathers the system ROM images from a directory of
//! loose files, a direct ZIP file, or a directory containing `hx20.zip`.

use hx20_machines::rom_loader::{RomLoadError, SystemRoms};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Resolve a ROM path and gather the system ROM images.
///
/// Resolution order:
/// 1. If `path` ends with `.zip`, load directly as a ZIP archive.
/// 2. If `path` is a directory containing `hx20.zip`, load that ZIP.
/// 3. Otherwise read the canonical ROM files from the directory.
pub fn load_rom_set(path: &Path) -> Result<SystemRoms, RomLoadError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }

    if path.is_dir() {
        let zip_path = path.join("hx20.zip");
        if zip_path.exists() {
            return load_from_zip(&zip_path);
        }
        return SystemRoms::open(path);
    }

    Err(RomLoadError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("ROM path not found: {}", path.display()),
    )))
}

/// Extract the ROM images from a ZIP archive; entries that are not part of
/// the system ROM set are ignored.
fn load_from_zip(path: &Path) -> Result<SystemRoms, RomLoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
    })?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("ZIP entry error: {e}"),
            )
        })?;

        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        entries.push((name, data));
    }

    Ok(SystemRoms::from_entries(entries))
}

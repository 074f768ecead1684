//! System ROM images and their validation.
//!
//! The HX-20 boots from a fixed set of five mask ROMs: BASIC (two chips),
//! the utility ROM and the monitor on the master, and the slave firmware.
//! Each image is validated against the CRC-32 of its known revisions (the
//! master ROMs shipped as 1.0 and 1.1, the slave ROM in a single revision)
//! before it is copied to its load address.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use hx20_core::mem::Memory;

/// One mask ROM: its canonical file name, where it loads, and which
/// revision checksums are accepted.
pub struct SystemRom {
    pub file: &'static str,
    pub size: usize,
    /// Load address in the target MCU's address space.
    pub address: u16,
    /// Accepted CRC-32 values across revisions.
    pub crc32: &'static [u32],
}

/// Master MCU ROMs, 8 KiB each. Two accepted checksums per image:
/// revisions 1.0 and 1.1.
pub static MASTER_ROMS: [SystemRom; 4] = [
    SystemRom {
        file: "basic1.rom",
        size: 0x2000,
        address: 0x8000,
        crc32: &[0x33fbb1ab, 0x4de0b4b6],
    },
    SystemRom {
        file: "basic2.rom",
        size: 0x2000,
        address: 0xA000,
        crc32: &[0x27d743ed, 0x10d6ae76],
    },
    SystemRom {
        file: "utility.rom",
        size: 0x2000,
        address: 0xC000,
        crc32: &[0xf5cc8868, 0x26c203a1],
    },
    SystemRom {
        file: "monitor.rom",
        size: 0x2000,
        address: 0xE000,
        crc32: &[0xed7482c6, 0x101cb3e8],
    },
];

/// Slave MCU firmware: 4 KiB at the top of the slave's address space.
pub static SLAVE_ROMS: [SystemRom; 1] = [SystemRom {
    file: "slave.rom",
    size: 0x1000,
    address: 0xF000,
    crc32: &[0xb36f5b99],
}];

/// Option ROM socket address on the master.
pub const OPTION_ROM_ADDRESS: u16 = 0x6000;

fn rom_map() -> impl Iterator<Item = &'static SystemRom> {
    MASTER_ROMS.iter().chain(SLAVE_ROMS.iter())
}

/// Reflected CRC-32 (polynomial 0xEDB88320), computed bit-serially. The
/// whole set is 36 KiB checked once at startup; a lookup table isn't worth
/// carrying.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let feedback = crc & 1 != 0;
            crc >>= 1;
            if feedback {
                crc ^= 0xEDB8_8320;
            }
        }
    }
    !crc
}

#[derive(Debug)]
pub enum RomLoadError {
    Io(io::Error),

    /// A system ROM image is absent from the set.
    MissingFile(String),

    /// An image does not have its mask ROM's size.
    SizeMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    /// An image matches none of the accepted revision checksums.
    ChecksumMismatch { file: String, actual: u32 },
}

impl std::fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::MissingFile(file) => write!(f, "system ROM '{file}' not found"),
            Self::SizeMismatch {
                file,
                expected,
                actual,
            } => write!(f, "system ROM '{file}' is {actual} bytes, expected {expected}"),
            Self::ChecksumMismatch { file, actual } => {
                write!(f, "system ROM '{file}' has invalid CRC32: {actual:08x}")
            }
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<io::Error> for RomLoadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// The gathered ROM images, keyed by their canonical file names and ready
/// for validation.
pub struct SystemRoms {
    images: HashMap<&'static str, Vec<u8>>,
}

impl SystemRoms {
    /// Read the five ROM image files from a directory. Only the canonical
    /// file names are touched; anything else in the directory is ignored.
    pub fn open(dir: &Path) -> Result<Self, RomLoadError> {
        let mut images = HashMap::new();
        for rom in rom_map() {
            match std::fs::read(dir.join(rom.file)) {
                Ok(data) => {
                    images.insert(rom.file, data);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(RomLoadError::MissingFile(rom.file.to_string()));
                }
                Err(e) => return Err(RomLoadError::Io(e)),
            }
        }
        Ok(Self { images })
    }

    /// Collect ROM images from (name, data) pairs, as extracted from an
    /// archive. Names outside the system ROM set are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        let mut images = HashMap::new();
        for (name, data) in entries {
            if let Some(rom) = rom_map().find(|rom| rom.file == name) {
                images.insert(rom.file, data);
            }
        }
        Self { images }
    }

    /// The raw bytes of one image, if present.
    pub fn image(&self, file: &str) -> Option<&[u8]> {
        self.images.get(file).map(Vec::as_slice)
    }
}

/// Validate a ROM table against the gathered images and copy each one to
/// its load address.
pub fn load_roms(
    table: &[SystemRom],
    roms: &SystemRoms,
    mem: &mut Memory,
) -> Result<(), RomLoadError> {
    for rom in table {
        let data = roms
            .image(rom.file)
            .ok_or_else(|| RomLoadError::MissingFile(rom.file.to_string()))?;

        if data.len() != rom.size {
            return Err(RomLoadError::SizeMismatch {
                file: rom.file.to_string(),
                expected: rom.size,
                actual: data.len(),
            });
        }

        let actual = crc32(data);
        if !rom.crc32.contains(&actual) {
            return Err(RomLoadError::ChecksumMismatch {
                file: rom.file.to_string(),
                actual,
            });
        }

        mem.write_area(rom.address, data);
        log::debug!("loaded {} at 0x{:04x}", rom.file, rom.address);
    }
    Ok(())
}

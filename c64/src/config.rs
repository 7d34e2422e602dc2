//! Machine configuration: ROM images.

use std::path::Path;

use crate::ConfigError;

/// Expected ROM sizes in bytes.
pub const KERNAL_ROM_SIZE: usize = 8192;
pub const BASIC_ROM_SIZE: usize = 8192;
pub const CHAR_ROM_SIZE: usize = 4096;

/// Configuration for constructing a C64 instance. PAL only.
pub struct C64Config {
    /// Kernal ROM (8,192 bytes).
    pub kernal_rom: Vec<u8>,
    /// BASIC ROM (8,192 bytes).
    pub basic_rom: Vec<u8>,
    /// Character ROM (4,096 bytes).
    pub char_rom: Vec<u8>,
}

impl C64Config {
    /// Load the three ROM images from a directory containing
    /// `kernal.rom`, `basic.rom` and `chargen.rom`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RomRead`] if a file is missing or unreadable,
    /// [`ConfigError::RomSize`] if a blob has the wrong length.
    pub fn from_rom_dir(dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            kernal_rom: load_rom(dir, "kernal.rom", "Kernal", KERNAL_ROM_SIZE)?,
            basic_rom: load_rom(dir, "basic.rom", "BASIC", BASIC_ROM_SIZE)?,
            char_rom: load_rom(dir, "chargen.rom", "Character", CHAR_ROM_SIZE)?,
        })
    }
}

fn load_rom(
    dir: &Path,
    file: &str,
    name: &'static str,
    expected: usize,
) -> Result<Vec<u8>, ConfigError> {
    let path = dir.join(file);
    let data = std::fs::read(&path).map_err(|source| ConfigError::RomRead {
        name,
        path: path.clone(),
        source,
    })?;
    if data.len() != expected {
        return Err(ConfigError::RomSize {
            name,
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}

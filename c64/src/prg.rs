//! PRG file loader.
//!
//! A PRG is the simplest C64 program image: a 2-byte little-endian load
//! address followed by the payload, written into RAM at that address.

use crate::memory::C64Memory;
use crate::ConfigError;

/// Load a PRG image into RAM. Returns the load address.
///
/// # Errors
///
/// [`ConfigError::PrgTooShort`] if the image cannot hold a load-address
/// header plus at least one payload byte.
pub fn load_prg(memory: &mut C64Memory, data: &[u8]) -> Result<u16, ConfigError> {
    if data.len() < 3 {
        return Err(ConfigError::PrgTooShort);
    }

    let load_addr = u16::from_le_bytes([data[0], data[1]]);
    for (i, &byte) in data[2..].iter().enumerate() {
        memory.ram_write(load_addr.wrapping_add(i as u16), byte);
    }
    Ok(load_addr)
}

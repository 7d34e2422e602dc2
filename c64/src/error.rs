//! Machine-level start-up errors.

use std::path::PathBuf;

use thiserror::Error;

/// A fault that prevents the machine from being constructed or loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A ROM blob has the wrong size.
    #[error("{name} ROM is {actual} bytes, expected {expected}")]
    RomSize {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A ROM file could not be read.
    #[error("cannot read {name} ROM at {path}: {source}")]
    RomRead {
        name: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    /// A PRG image is too short to hold its load-address header.
    #[error("PRG file too short: need a 2-byte load address plus payload")]
    PrgTooShort,

    /// The CPU instruction table failed to build.
    #[error(transparent)]
    Cpu(#[from] mos_6510::ConfigError),
}

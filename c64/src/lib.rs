//! PAL Commodore 64 emulator core.
//!
//! The CPU drives everything: after each instruction the VIC-II derives
//! its raster position from the cumulative cycle counter (312 lines x 63
//! cycles = 19,656 cycles per ~50.12 Hz frame) and rasterizes each scan
//! line as it completes. The CIAs tick at coarse wall-clock microsecond
//! granularity.

mod bus;
mod c64;
pub mod capture;
mod cia;
mod config;
mod error;
pub mod input;
mod keyboard;
pub mod keyboard_map;
mod memory;
pub mod palette;
pub mod prg;
mod sid;
pub mod vic;

pub use bus::C64Bus;
pub use c64::C64;
pub use cia::Cia;
pub use config::C64Config;
pub use error::ConfigError;
pub use input::C64Key;
pub use keyboard::KeyboardMatrix;
pub use memory::C64Memory;
pub use mos_6510::ExecutionError;
pub use vic::Vic;

//! Core abstractions for the emu64 emulator.

mod bus;
mod simple_bus;

pub use bus::Bus;
pub use simple_bus::SimpleBus;

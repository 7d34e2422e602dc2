//! MOS 6510 CPU emulator.
//!
//! The 6510 is the C64 variant of the NMOS 6502; the I/O port at $00-$01
//! that distinguishes it is handled by the memory subsystem, not here.
//!
//! Execution is instruction-granular: `step()` runs one complete
//! instruction and accounts its cycle cost, including the page-crossing
//! and branch penalties the hardware charges. Dispatch goes through a
//! 256-entry opcode table built once at start-up; registering the same
//! opcode twice is a configuration error.

mod addressing;
mod cpu;
mod error;
pub mod flags;
mod opcodes;
mod registers;

pub use cpu::Mos6510;
pub use error::{ConfigError, ExecutionError};
pub use flags::Status;
pub use opcodes::{AddrMode, Handler, OpEntry, OpcodeTable};
pub use registers::Registers;

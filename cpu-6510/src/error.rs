//! CPU error types.
//!
//! `ExecutionError` is fatal to the run loop and carries the diagnostic
//! the loop prints: register dump plus the memory bytes around PC.
//! `ConfigError` is fatal at start-up.

use thiserror::Error;

/// A runtime fault that stops the run loop.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The opcode at PC has no entry in the instruction table.
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}\n  {registers}\n  {disassembly}\n  {memory}")]
    IllegalOpcode {
        opcode: u8,
        pc: u16,
        /// Register dump at the point of failure.
        registers: String,
        /// One-line disassembly of the faulting instruction.
        disassembly: String,
        /// Hex dump of the memory line around PC.
        memory: String,
    },
}

/// A start-up configuration fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The same opcode was registered twice while building the table.
    #[error("opcode ${opcode:02X} ({mnemonic}) registered twice in the instruction table")]
    DuplicateOpcode { opcode: u8, mnemonic: &'static str },
}

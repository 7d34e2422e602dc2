//! The 256-entry instruction table.
//!
//! Every table entry carries its mnemonic, addressing mode and base cycle
//! cost as data. Handlers come in three shapes:
//!
//! 1. [`Handler::NoOperand`] - parameterless instructions. These get the
//!    bus because jumps, calls and stack operations move bytes themselves.
//! 2. [`Handler::Read`] - instructions consuming a resolved operand byte.
//!    Branches are read instructions whose operand is the displacement.
//! 3. [`Handler::Modify`] - read-modify-write instructions: the handler
//!    receives the fetched byte and returns the byte to store back (to the
//!    same address, or to A in accumulator mode). Stores use this shape
//!    too, ignoring the fetched byte and returning the register.
//!
//! Registering the same opcode twice aborts table construction with a
//! [`ConfigError`].

use emu64_core::Bus;

use crate::cpu::Mos6510;
use crate::ConfigError;

/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operand (CLC, RTS, ...).
    Implied,
    /// Operates on the A register (ASL A, ...).
    Accumulator,
    /// #$nn - literal byte.
    Immediate,
    /// $nn - address in page zero.
    ZeroPage,
    /// $nn,X - zero page plus X, wraps within page zero.
    ZeroPageX,
    /// $nn,Y - zero page plus Y, wraps within page zero.
    ZeroPageY,
    /// $nnnn - 16-bit address.
    Absolute,
    /// $nnnn,X - may cross a page.
    AbsoluteX,
    /// $nnnn,Y - may cross a page.
    AbsoluteY,
    /// ($nn,X) - pre-indexed pointer in page zero.
    IndexedIndirectX,
    /// ($nn),Y - post-indexed zero-page pointer.
    IndirectIndexedY,
    /// Branch displacement, -128 to +127.
    Relative,
    /// ($nnnn) - JMP only, with the page-wrap hardware bug.
    Indirect,
}

/// The three handler shapes.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Zero-operand instruction.
    NoOperand(fn(&mut Mos6510, &mut dyn Bus)),
    /// Read instruction: receives the resolved operand byte.
    Read(fn(&mut Mos6510, u8)),
    /// Read-modify-write: receives the operand, returns the result.
    Modify(fn(&mut Mos6510, u8) -> u8),
}

/// One instruction table entry.
#[derive(Clone, Copy)]
pub struct OpEntry {
    pub mnemonic: &'static str,
    pub mode: AddrMode,
    /// Base cycle cost. Page-crossing and branch penalties are added by
    /// the dispatcher.
    pub cycles: u8,
    pub handler: Handler,
}

fn no_operand(
    mnemonic: &'static str,
    cycles: u8,
    f: fn(&mut Mos6510, &mut dyn Bus),
) -> OpEntry {
    OpEntry {
        mnemonic,
        mode: AddrMode::Implied,
        cycles,
        handler: Handler::NoOperand(f),
    }
}

fn control(
    mnemonic: &'static str,
    mode: AddrMode,
    cycles: u8,
    f: fn(&mut Mos6510, &mut dyn Bus),
) -> OpEntry {
    OpEntry {
        mnemonic,
        mode,
        cycles,
        handler: Handler::NoOperand(f),
    }
}

fn read(mnemonic: &'static str, mode: AddrMode, cycles: u8, f: fn(&mut Mos6510, u8)) -> OpEntry {
    OpEntry {
        mnemonic,
        mode,
        cycles,
        handler: Handler::Read(f),
    }
}

fn modify(
    mnemonic: &'static str,
    mode: AddrMode,
    cycles: u8,
    f: fn(&mut Mos6510, u8) -> u8,
) -> OpEntry {
    OpEntry {
        mnemonic,
        mode,
        cycles,
        handler: Handler::Modify(f),
    }
}

/// The instruction table: 256 slots, one per opcode.
pub struct OpcodeTable {
    entries: [Option<OpEntry>; 256],
}

impl OpcodeTable {
    /// Build the table with all documented opcodes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateOpcode`] if an opcode is registered
    /// twice - a programming error that must abort initialization.
    pub fn new() -> Result<Self, ConfigError> {
        let mut table = Self {
            entries: [None; 256],
        };
        table.register_load_store()?;
        table.register_transfers()?;
        table.register_arithmetic()?;
        table.register_inc_dec()?;
        table.register_shifts()?;
        table.register_branches()?;
        table.register_jumps()?;
        table.register_stack()?;
        table.register_flags()?;
        table.register_system()?;
        Ok(table)
    }

    /// Look up an opcode. `None` means an illegal/undocumented opcode.
    #[must_use]
    pub fn get(&self, opcode: u8) -> Option<OpEntry> {
        self.entries[opcode as usize]
    }

    fn add(&mut self, opcode: u8, entry: OpEntry) -> Result<(), ConfigError> {
        if self.entries[opcode as usize].is_some() {
            return Err(ConfigError::DuplicateOpcode {
                opcode,
                mnemonic: entry.mnemonic,
            });
        }
        self.entries[opcode as usize] = Some(entry);
        Ok(())
    }

    fn register_load_store(&mut self) -> Result<(), ConfigError> {
        use AddrMode::*;

        self.add(0xA9, read("LDA", Immediate, 2, Mos6510::lda))?;
        self.add(0xA5, read("LDA", ZeroPage, 3, Mos6510::lda))?;
        self.add(0xB5, read("LDA", ZeroPageX, 4, Mos6510::lda))?;
        self.add(0xAD, read("LDA", Absolute, 4, Mos6510::lda))?;
        self.add(0xBD, read("LDA", AbsoluteX, 4, Mos6510::lda))?;
        self.add(0xB9, read("LDA", AbsoluteY, 4, Mos6510::lda))?;
        self.add(0xA1, read("LDA", IndexedIndirectX, 6, Mos6510::lda))?;
        self.add(0xB1, read("LDA", IndirectIndexedY, 5, Mos6510::lda))?;

        self.add(0xA2, read("LDX", Immediate, 2, Mos6510::ldx))?;
        self.add(0xA6, read("LDX", ZeroPage, 3, Mos6510::ldx))?;
        self.add(0xB6, read("LDX", ZeroPageY, 4, Mos6510::ldx))?;
        self.add(0xAE, read("LDX", Absolute, 4, Mos6510::ldx))?;
        self.add(0xBE, read("LDX", AbsoluteY, 4, Mos6510::ldx))?;

        self.add(0xA0, read("LDY", Immediate, 2, Mos6510::ldy))?;
        self.add(0xA4, read("LDY", ZeroPage, 3, Mos6510::ldy))?;
        self.add(0xB4, read("LDY", ZeroPageX, 4, Mos6510::ldy))?;
        self.add(0xAC, read("LDY", Absolute, 4, Mos6510::ldy))?;
        self.add(0xBC, read("LDY", AbsoluteX, 4, Mos6510::ldy))?;

        self.add(0x85, modify("STA", ZeroPage, 3, Mos6510::sta))?;
        self.add(0x95, modify("STA", ZeroPageX, 4, Mos6510::sta))?;
        self.add(0x8D, modify("STA", Absolute, 4, Mos6510::sta))?;
        self.add(0x9D, modify("STA", AbsoluteX, 5, Mos6510::sta))?;
        self.add(0x99, modify("STA", AbsoluteY, 5, Mos6510::sta))?;
        self.add(0x81, modify("STA", IndexedIndirectX, 6, Mos6510::sta))?;
        self.add(0x91, modify("STA", IndirectIndexedY, 6, Mos6510::sta))?;

        self.add(0x86, modify("STX", ZeroPage, 3, Mos6510::stx))?;
        self.add(0x96, modify("STX", ZeroPageY, 4, Mos6510::stx))?;
        self.add(0x8E, modify("STX", Absolute, 4, Mos6510::stx))?;

        self.add(0x84, modify("STY", ZeroPage, 3, Mos6510::sty))?;
        self.add(0x94, modify("STY", ZeroPageX, 4, Mos6510::sty))?;
        self.add(0x8C, modify("STY", Absolute, 4, Mos6510::sty))?;

        Ok(())
    }

    fn register_transfers(&mut self) -> Result<(), ConfigError> {
        self.add(0xAA, no_operand("TAX", 2, Mos6510::tax))?;
        self.add(0xA8, no_operand("TAY", 2, Mos6510::tay))?;
        self.add(0x8A, no_operand("TXA", 2, Mos6510::txa))?;
        self.add(0x98, no_operand("TYA", 2, Mos6510::tya))?;
        self.add(0xBA, no_operand("TSX", 2, Mos6510::tsx))?;
        self.add(0x9A, no_operand("TXS", 2, Mos6510::txs))?;
        Ok(())
    }

    fn register_arithmetic(&mut self) -> Result<(), ConfigError> {
        use AddrMode::*;

        self.add(0x69, read("ADC", Immediate, 2, Mos6510::adc))?;
        self.add(0x65, read("ADC", ZeroPage, 3, Mos6510::adc))?;
        self.add(0x75, read("ADC", ZeroPageX, 4, Mos6510::adc))?;
        self.add(0x6D, read("ADC", Absolute, 4, Mos6510::adc))?;
        self.add(0x7D, read("ADC", AbsoluteX, 4, Mos6510::adc))?;
        self.add(0x79, read("ADC", AbsoluteY, 4, Mos6510::adc))?;
        self.add(0x61, read("ADC", IndexedIndirectX, 6, Mos6510::adc))?;
        self.add(0x71, read("ADC", IndirectIndexedY, 5, Mos6510::adc))?;

        self.add(0xE9, read("SBC", Immediate, 2, Mos6510::sbc))?;
        self.add(0xE5, read("SBC", ZeroPage, 3, Mos6510::sbc))?;
        self.add(0xF5, read("SBC", ZeroPageX, 4, Mos6510::sbc))?;
        self.add(0xED, read("SBC", Absolute, 4, Mos6510::sbc))?;
        self.add(0xFD, read("SBC", AbsoluteX, 4, Mos6510::sbc))?;
        self.add(0xF9, read("SBC", AbsoluteY, 4, Mos6510::sbc))?;
        self.add(0xE1, read("SBC", IndexedIndirectX, 6, Mos6510::sbc))?;
        self.add(0xF1, read("SBC", IndirectIndexedY, 5, Mos6510::sbc))?;

        self.add(0x29, read("AND", Immediate, 2, Mos6510::and))?;
        self.add(0x25, read("AND", ZeroPage, 3, Mos6510::and))?;
        self.add(0x35, read("AND", ZeroPageX, 4, Mos6510::and))?;
        self.add(0x2D, read("AND", Absolute, 4, Mos6510::and))?;
        self.add(0x3D, read("AND", AbsoluteX, 4, Mos6510::and))?;
        self.add(0x39, read("AND", AbsoluteY, 4, Mos6510::and))?;
        self.add(0x21, read("AND", IndexedIndirectX, 6, Mos6510::and))?;
        self.add(0x31, read("AND", IndirectIndexedY, 5, Mos6510::and))?;

        self.add(0x09, read("ORA", Immediate, 2, Mos6510::ora))?;
        self.add(0x05, read("ORA", ZeroPage, 3, Mos6510::ora))?;
        self.add(0x15, read("ORA", ZeroPageX, 4, Mos6510::ora))?;
        self.add(0x0D, read("ORA", Absolute, 4, Mos6510::ora))?;
        self.add(0x1D, read("ORA", AbsoluteX, 4, Mos6510::ora))?;
        self.add(0x19, read("ORA", AbsoluteY, 4, Mos6510::ora))?;
        self.add(0x01, read("ORA", IndexedIndirectX, 6, Mos6510::ora))?;
        self.add(0x11, read("ORA", IndirectIndexedY, 5, Mos6510::ora))?;

        self.add(0x49, read("EOR", Immediate, 2, Mos6510::eor))?;
        self.add(0x45, read("EOR", ZeroPage, 3, Mos6510::eor))?;
        self.add(0x55, read("EOR", ZeroPageX, 4, Mos6510::eor))?;
        self.add(0x4D, read("EOR", Absolute, 4, Mos6510::eor))?;
        self.add(0x5D, read("EOR", AbsoluteX, 4, Mos6510::eor))?;
        self.add(0x59, read("EOR", AbsoluteY, 4, Mos6510::eor))?;
        self.add(0x41, read("EOR", IndexedIndirectX, 6, Mos6510::eor))?;
        self.add(0x51, read("EOR", IndirectIndexedY, 5, Mos6510::eor))?;

        self.add(0xC9, read("CMP", Immediate, 2, Mos6510::cmp))?;
        self.add(0xC5, read("CMP", ZeroPage, 3, Mos6510::cmp))?;
        self.add(0xD5, read("CMP", ZeroPageX, 4, Mos6510::cmp))?;
        self.add(0xCD, read("CMP", Absolute, 4, Mos6510::cmp))?;
        self.add(0xDD, read("CMP", AbsoluteX, 4, Mos6510::cmp))?;
        self.add(0xD9, read("CMP", AbsoluteY, 4, Mos6510::cmp))?;
        self.add(0xC1, read("CMP", IndexedIndirectX, 6, Mos6510::cmp))?;
        self.add(0xD1, read("CMP", IndirectIndexedY, 5, Mos6510::cmp))?;

        self.add(0xE0, read("CPX", Immediate, 2, Mos6510::cpx))?;
        self.add(0xE4, read("CPX", ZeroPage, 3, Mos6510::cpx))?;
        self.add(0xEC, read("CPX", Absolute, 4, Mos6510::cpx))?;

        self.add(0xC0, read("CPY", Immediate, 2, Mos6510::cpy))?;
        self.add(0xC4, read("CPY", ZeroPage, 3, Mos6510::cpy))?;
        self.add(0xCC, read("CPY", Absolute, 4, Mos6510::cpy))?;

        self.add(0x24, read("BIT", ZeroPage, 3, Mos6510::bit))?;
        self.add(0x2C, read("BIT", Absolute, 4, Mos6510::bit))?;

        Ok(())
    }

    fn register_inc_dec(&mut self) -> Result<(), ConfigError> {
        use AddrMode::*;

        self.add(0xE6, modify("INC", ZeroPage, 5, Mos6510::inc))?;
        self.add(0xF6, modify("INC", ZeroPageX, 6, Mos6510::inc))?;
        self.add(0xEE, modify("INC", Absolute, 6, Mos6510::inc))?;
        self.add(0xFE, modify("INC", AbsoluteX, 7, Mos6510::inc))?;

        self.add(0xC6, modify("DEC", ZeroPage, 5, Mos6510::dec))?;
        self.add(0xD6, modify("DEC", ZeroPageX, 6, Mos6510::dec))?;
        self.add(0xCE, modify("DEC", Absolute, 6, Mos6510::dec))?;
        self.add(0xDE, modify("DEC", AbsoluteX, 7, Mos6510::dec))?;

        self.add(0xE8, no_operand("INX", 2, Mos6510::inx))?;
        self.add(0xC8, no_operand("INY", 2, Mos6510::iny))?;
        self.add(0xCA, no_operand("DEX", 2, Mos6510::dex))?;
        self.add(0x88, no_operand("DEY", 2, Mos6510::dey))?;

        Ok(())
    }

    fn register_shifts(&mut self) -> Result<(), ConfigError> {
        use AddrMode::*;

        self.add(0x0A, modify("ASL", Accumulator, 2, Mos6510::asl))?;
        self.add(0x06, modify("ASL", ZeroPage, 5, Mos6510::asl))?;
        self.add(0x16, modify("ASL", ZeroPageX, 6, Mos6510::asl))?;
        self.add(0x0E, modify("ASL", Absolute, 6, Mos6510::asl))?;
        self.add(0x1E, modify("ASL", AbsoluteX, 7, Mos6510::asl))?;

        self.add(0x4A, modify("LSR", Accumulator, 2, Mos6510::lsr))?;
        self.add(0x46, modify("LSR", ZeroPage, 5, Mos6510::lsr))?;
        self.add(0x56, modify("LSR", ZeroPageX, 6, Mos6510::lsr))?;
        self.add(0x4E, modify("LSR", Absolute, 6, Mos6510::lsr))?;
        self.add(0x5E, modify("LSR", AbsoluteX, 7, Mos6510::lsr))?;

        self.add(0x2A, modify("ROL", Accumulator, 2, Mos6510::rol))?;
        self.add(0x26, modify("ROL", ZeroPage, 5, Mos6510::rol))?;
        self.add(0x36, modify("ROL", ZeroPageX, 6, Mos6510::rol))?;
        self.add(0x2E, modify("ROL", Absolute, 6, Mos6510::rol))?;
        self.add(0x3E, modify("ROL", AbsoluteX, 7, Mos6510::rol))?;

        self.add(0x6A, modify("ROR", Accumulator, 2, Mos6510::ror))?;
        self.add(0x66, modify("ROR", ZeroPage, 5, Mos6510::ror))?;
        self.add(0x76, modify("ROR", ZeroPageX, 6, Mos6510::ror))?;
        self.add(0x6E, modify("ROR", Absolute, 6, Mos6510::ror))?;
        self.add(0x7E, modify("ROR", AbsoluteX, 7, Mos6510::ror))?;

        Ok(())
    }

    fn register_branches(&mut self) -> Result<(), ConfigError> {
        use AddrMode::Relative;

        self.add(0x10, read("BPL", Relative, 2, Mos6510::bpl))?;
        self.add(0x30, read("BMI", Relative, 2, Mos6510::bmi))?;
        self.add(0x50, read("BVC", Relative, 2, Mos6510::bvc))?;
        self.add(0x70, read("BVS", Relative, 2, Mos6510::bvs))?;
        self.add(0x90, read("BCC", Relative, 2, Mos6510::bcc))?;
        self.add(0xB0, read("BCS", Relative, 2, Mos6510::bcs))?;
        self.add(0xD0, read("BNE", Relative, 2, Mos6510::bne))?;
        self.add(0xF0, read("BEQ", Relative, 2, Mos6510::beq))?;

        Ok(())
    }

    fn register_jumps(&mut self) -> Result<(), ConfigError> {
        self.add(0x4C, control("JMP", AddrMode::Absolute, 3, Mos6510::jmp_abs))?;
        self.add(0x6C, control("JMP", AddrMode::Indirect, 5, Mos6510::jmp_ind))?;
        self.add(0x20, control("JSR", AddrMode::Absolute, 6, Mos6510::jsr))?;
        self.add(0x60, no_operand("RTS", 6, Mos6510::rts))?;
        Ok(())
    }

    fn register_stack(&mut self) -> Result<(), ConfigError> {
        self.add(0x48, no_operand("PHA", 3, Mos6510::pha))?;
        self.add(0x68, no_operand("PLA", 4, Mos6510::pla))?;
        self.add(0x08, no_operand("PHP", 3, Mos6510::php))?;
        self.add(0x28, no_operand("PLP", 4, Mos6510::plp))?;
        Ok(())
    }

    fn register_flags(&mut self) -> Result<(), ConfigError> {
        self.add(0x18, no_operand("CLC", 2, Mos6510::clc))?;
        self.add(0x38, no_operand("SEC", 2, Mos6510::sec))?;
        self.add(0x58, no_operand("CLI", 2, Mos6510::cli))?;
        self.add(0x78, no_operand("SEI", 2, Mos6510::sei))?;
        self.add(0xD8, no_operand("CLD", 2, Mos6510::cld))?;
        self.add(0xF8, no_operand("SED", 2, Mos6510::sed))?;
        self.add(0xB8, no_operand("CLV", 2, Mos6510::clv))?;
        Ok(())
    }

    fn register_system(&mut self) -> Result<(), ConfigError> {
        self.add(0xEA, no_operand("NOP", 2, Mos6510::nop))?;
        self.add(0x00, no_operand("BRK", 7, Mos6510::brk))?;
        self.add(0x40, no_operand("RTI", 6, Mos6510::rti))?;
        Ok(())
    }
}

//! MOS 6510 CPU: instruction dispatch, interrupts, ALU semantics.

use std::fmt::Write as _;

use emu64_core::Bus;

use crate::flags::{B, C, D, I, N, V, Z};
use crate::opcodes::{AddrMode, Handler, OpcodeTable};
use crate::{ConfigError, ExecutionError, Registers, Status};

/// Reset vector.
const RESET_VECTOR: u16 = 0xFFFC;
/// Non-maskable interrupt vector.
const NMI_VECTOR: u16 = 0xFFFA;
/// IRQ and BRK share a vector.
const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles consumed by an interrupt entry sequence (and by BRK).
const INTERRUPT_CYCLES: u32 = 7;

/// The MOS 6510 CPU.
///
/// `step()` executes one whole instruction against a borrowed bus and
/// returns its cycle cost; the cumulative count lives in `regs.cycles`.
pub struct Mos6510 {
    /// CPU registers.
    pub regs: Registers,

    /// The 256-entry instruction table.
    table: OpcodeTable,

    /// NMI requested since the last step.
    nmi_pending: bool,

    /// IRQ line active. Level-sensitive: the machine re-raises it every
    /// step while a device holds the line.
    irq_pending: bool,

    /// Extra cycles charged by a taken branch, drained per step.
    branch_penalty: u8,
}

impl Mos6510 {
    /// Create a CPU with a freshly built instruction table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the instruction table registration is
    /// inconsistent (an opcode added twice).
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            regs: Registers::new(),
            table: OpcodeTable::new()?,
            nmi_pending: false,
            irq_pending: false,
            branch_penalty: 0,
        })
    }

    /// Hardware reset: registers to their reset state, PC from $FFFC.
    pub fn reset(&mut self, bus: &mut dyn Bus) {
        self.regs.reset();
        self.nmi_pending = false;
        self.irq_pending = false;
        self.branch_penalty = 0;
        self.regs.pc = self.read_word(bus, RESET_VECTOR);
    }

    /// Raise the IRQ line. Serviced before the next instruction when the
    /// I flag is clear.
    pub fn signal_irq(&mut self) {
        self.irq_pending = true;
    }

    /// Raise the NMI line. Serviced unconditionally before the next
    /// instruction.
    pub fn signal_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Execute one instruction (or service a pending interrupt).
    ///
    /// Returns the cycles consumed, which have already been added to
    /// `regs.cycles`.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::IllegalOpcode`] if the byte at PC has no table
    /// entry. The error carries the diagnostic the run loop surfaces.
    pub fn step(&mut self, bus: &mut dyn Bus) -> Result<u32, ExecutionError> {
        if self.nmi_pending {
            self.nmi_pending = false;
            return Ok(self.service_interrupt(bus, NMI_VECTOR));
        }
        if std::mem::take(&mut self.irq_pending) && !self.regs.p.is_set(I) {
            return Ok(self.service_interrupt(bus, IRQ_VECTOR));
        }

        let pc = self.regs.pc;
        let opcode = self.fetch(bus);
        let Some(entry) = self.table.get(opcode) else {
            return Err(self.illegal_opcode(&*bus, pc, opcode));
        };

        let mut cycles = u32::from(entry.cycles);
        match entry.handler {
            Handler::NoOperand(f) => f(self, bus),
            Handler::Read(f) => {
                let (value, page_crossed) = self.read_operand(bus, entry.mode);
                if page_crossed {
                    cycles += 1;
                }
                f(self, value);
            }
            Handler::Modify(f) => {
                if entry.mode == AddrMode::Accumulator {
                    let value = self.regs.a;
                    self.regs.a = f(self, value);
                } else {
                    let addr = self.operand_address(bus, entry.mode);
                    let value = bus.read(addr);
                    let result = f(self, value);
                    bus.write(addr, result);
                }
            }
        }

        cycles += u32::from(std::mem::take(&mut self.branch_penalty));
        self.regs.cycles += u64::from(cycles);
        Ok(cycles)
    }

    /// Push PC and status (B clear), set I, load PC from the vector.
    fn service_interrupt(&mut self, bus: &mut dyn Bus, vector: u16) -> u32 {
        self.push_word(bus, self.regs.pc);
        let status = self.regs.p.to_byte();
        self.push(bus, status);
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        self.regs.cycles += u64::from(INTERRUPT_CYCLES);
        INTERRUPT_CYCLES
    }

    fn illegal_opcode(&self, bus: &dyn Bus, pc: u16, opcode: u8) -> ExecutionError {
        ExecutionError::IllegalOpcode {
            opcode,
            pc,
            registers: self.regs.dump(),
            disassembly: disassembly_line(pc, opcode),
            memory: memory_line(bus, pc),
        }
    }

    // =========================================================================
    // Load / store / transfer handlers
    // =========================================================================

    pub(crate) fn lda(&mut self, value: u8) {
        self.regs.a = value;
        self.regs.p.update_nz(value);
    }

    pub(crate) fn ldx(&mut self, value: u8) {
        self.regs.x = value;
        self.regs.p.update_nz(value);
    }

    pub(crate) fn ldy(&mut self, value: u8) {
        self.regs.y = value;
        self.regs.p.update_nz(value);
    }

    // Stores ignore the fetched byte and provide the register.
    pub(crate) fn sta(&mut self, _value: u8) -> u8 {
        self.regs.a
    }

    pub(crate) fn stx(&mut self, _value: u8) -> u8 {
        self.regs.x
    }

    pub(crate) fn sty(&mut self, _value: u8) -> u8 {
        self.regs.y
    }

    pub(crate) fn tax(&mut self, _bus: &mut dyn Bus) {
        self.regs.x = self.regs.a;
        self.regs.p.update_nz(self.regs.x);
    }

    pub(crate) fn tay(&mut self, _bus: &mut dyn Bus) {
        self.regs.y = self.regs.a;
        self.regs.p.update_nz(self.regs.y);
    }

    pub(crate) fn txa(&mut self, _bus: &mut dyn Bus) {
        self.regs.a = self.regs.x;
        self.regs.p.update_nz(self.regs.a);
    }

    pub(crate) fn tya(&mut self, _bus: &mut dyn Bus) {
        self.regs.a = self.regs.y;
        self.regs.p.update_nz(self.regs.a);
    }

    pub(crate) fn tsx(&mut self, _bus: &mut dyn Bus) {
        self.regs.x = self.regs.sp;
        self.regs.p.update_nz(self.regs.x);
    }

    /// TXS does not touch flags.
    pub(crate) fn txs(&mut self, _bus: &mut dyn Bus) {
        self.regs.sp = self.regs.x;
    }

    // =========================================================================
    // Arithmetic and logic
    // =========================================================================

    pub(crate) fn adc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(value) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (value ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));

        let mut lo = (a & 0x0F) + (value & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (value >> 4) + u8::from(lo > 0x0F);

        // Z, N and V come from the intermediate binary result (NMOS).
        let bin = (u16::from(a) + u16::from(value) + u16::from(carry)) as u8;
        self.regs.p.set_if(Z, bin == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        self.regs
            .p
            .set_if(V, (a ^ bin) & (value ^ bin) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }
        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    pub(crate) fn sbc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.sbc_decimal(value);
        } else {
            // SBC is ADC with the operand inverted.
            self.adc_binary(!value);
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        // Flags from the binary result (NMOS).
        let bin = i16::from(a) - i16::from(value) - borrow;
        self.regs.p.set_if(C, bin >= 0);
        self.regs.p.set_if(Z, (bin as u8) == 0);
        self.regs.p.set_if(N, bin & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ bin) & (i16::from(a) ^ i16::from(value)) & 0x80 != 0,
        );

        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }

    pub(crate) fn and(&mut self, value: u8) {
        self.regs.a &= value;
        self.regs.p.update_nz(self.regs.a);
    }

    pub(crate) fn ora(&mut self, value: u8) {
        self.regs.a |= value;
        self.regs.p.update_nz(self.regs.a);
    }

    pub(crate) fn eor(&mut self, value: u8) {
        self.regs.a ^= value;
        self.regs.p.update_nz(self.regs.a);
    }

    pub(crate) fn cmp(&mut self, value: u8) {
        let result = self.regs.a.wrapping_sub(value);
        self.regs.p.set_if(C, self.regs.a >= value);
        self.regs.p.update_nz(result);
    }

    pub(crate) fn cpx(&mut self, value: u8) {
        let result = self.regs.x.wrapping_sub(value);
        self.regs.p.set_if(C, self.regs.x >= value);
        self.regs.p.update_nz(result);
    }

    pub(crate) fn cpy(&mut self, value: u8) {
        let result = self.regs.y.wrapping_sub(value);
        self.regs.p.set_if(C, self.regs.y >= value);
        self.regs.p.update_nz(result);
    }

    pub(crate) fn bit(&mut self, value: u8) {
        self.regs.p.set_if(Z, self.regs.a & value == 0);
        self.regs.p.set_if(N, value & 0x80 != 0);
        self.regs.p.set_if(V, value & 0x40 != 0);
    }

    // =========================================================================
    // Increments, decrements, shifts
    // =========================================================================

    pub(crate) fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn inx(&mut self, _bus: &mut dyn Bus) {
        self.regs.x = self.regs.x.wrapping_add(1);
        self.regs.p.update_nz(self.regs.x);
    }

    pub(crate) fn iny(&mut self, _bus: &mut dyn Bus) {
        self.regs.y = self.regs.y.wrapping_add(1);
        self.regs.p.update_nz(self.regs.y);
    }

    pub(crate) fn dex(&mut self, _bus: &mut dyn Bus) {
        self.regs.x = self.regs.x.wrapping_sub(1);
        self.regs.p.update_nz(self.regs.x);
    }

    pub(crate) fn dey(&mut self, _bus: &mut dyn Bus) {
        self.regs.y = self.regs.y.wrapping_sub(1);
        self.regs.p.update_nz(self.regs.y);
    }

    pub(crate) fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    pub(crate) fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Common branch logic: +1 cycle when taken, +1 more across a page.
    fn branch(&mut self, taken: bool, displacement: u8) {
        if taken {
            let target = self.regs.pc.wrapping_add(i16::from(displacement as i8) as u16);
            self.branch_penalty += 1;
            if (target ^ self.regs.pc) & 0xFF00 != 0 {
                self.branch_penalty += 1;
            }
            self.regs.pc = target;
        }
    }

    pub(crate) fn bpl(&mut self, displacement: u8) {
        let taken = !self.regs.p.is_set(N);
        self.branch(taken, displacement);
    }

    pub(crate) fn bmi(&mut self, displacement: u8) {
        let taken = self.regs.p.is_set(N);
        self.branch(taken, displacement);
    }

    pub(crate) fn bvc(&mut self, displacement: u8) {
        let taken = !self.regs.p.is_set(V);
        self.branch(taken, displacement);
    }

    pub(crate) fn bvs(&mut self, displacement: u8) {
        let taken = self.regs.p.is_set(V);
        self.branch(taken, displacement);
    }

    pub(crate) fn bcc(&mut self, displacement: u8) {
        let taken = !self.regs.p.is_set(C);
        self.branch(taken, displacement);
    }

    pub(crate) fn bcs(&mut self, displacement: u8) {
        let taken = self.regs.p.is_set(C);
        self.branch(taken, displacement);
    }

    pub(crate) fn bne(&mut self, displacement: u8) {
        let taken = !self.regs.p.is_set(Z);
        self.branch(taken, displacement);
    }

    pub(crate) fn beq(&mut self, displacement: u8) {
        let taken = self.regs.p.is_set(Z);
        self.branch(taken, displacement);
    }

    // =========================================================================
    // Jumps, calls, stack
    // =========================================================================

    pub(crate) fn jmp_abs(&mut self, bus: &mut dyn Bus) {
        self.regs.pc = self.fetch_word(bus);
    }

    /// JMP ($nnnn) with the page-wrap hardware bug.
    pub(crate) fn jmp_ind(&mut self, bus: &mut dyn Bus) {
        let pointer = self.fetch_word(bus);
        self.regs.pc = self.read_word_page_bug(bus, pointer);
    }

    pub(crate) fn jsr(&mut self, bus: &mut dyn Bus) {
        let target = self.fetch_word(bus);
        // The 6502 pushes the address of the last operand byte; RTS adds 1.
        let return_addr = self.regs.pc.wrapping_sub(1);
        self.push_word(bus, return_addr);
        self.regs.pc = target;
    }

    pub(crate) fn rts(&mut self, bus: &mut dyn Bus) {
        self.regs.pc = self.pull_word(bus).wrapping_add(1);
    }

    pub(crate) fn pha(&mut self, bus: &mut dyn Bus) {
        let a = self.regs.a;
        self.push(bus, a);
    }

    pub(crate) fn pla(&mut self, bus: &mut dyn Bus) {
        self.regs.a = self.pull(bus);
        self.regs.p.update_nz(self.regs.a);
    }

    /// PHP pushes with the break bit set, like BRK.
    pub(crate) fn php(&mut self, bus: &mut dyn Bus) {
        let status = self.regs.p.to_byte_brk();
        self.push(bus, status);
    }

    pub(crate) fn plp(&mut self, bus: &mut dyn Bus) {
        let value = self.pull(bus);
        self.regs.p = Status::from_byte(value & !B);
    }

    // =========================================================================
    // Flag operations
    // =========================================================================

    pub(crate) fn clc(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.clear(C);
    }

    pub(crate) fn sec(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.set(C);
    }

    pub(crate) fn cli(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.clear(I);
    }

    pub(crate) fn sei(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.set(I);
    }

    pub(crate) fn cld(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.clear(D);
    }

    pub(crate) fn sed(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.set(D);
    }

    pub(crate) fn clv(&mut self, _bus: &mut dyn Bus) {
        self.regs.p.clear(V);
    }

    // =========================================================================
    // System
    // =========================================================================

    pub(crate) fn nop(&mut self, _bus: &mut dyn Bus) {}

    /// BRK: push PC+1 (past the padding byte) and status with B=1, set I,
    /// vector through $FFFE.
    pub(crate) fn brk(&mut self, bus: &mut dyn Bus) {
        // The byte after BRK is padding; PC has already advanced past the
        // opcode, so one more increment skips it.
        let return_addr = self.regs.pc.wrapping_add(1);
        self.push_word(bus, return_addr);
        let status = self.regs.p.to_byte_brk();
        self.push(bus, status);
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, IRQ_VECTOR);
    }

    pub(crate) fn rti(&mut self, bus: &mut dyn Bus) {
        let status = self.pull(bus);
        self.regs.p = Status::from_byte(status & !B);
        self.regs.pc = self.pull_word(bus);
    }
}

/// One-line disassembly of the faulting instruction. Illegal opcodes
/// have no mnemonic, so the byte is shown as such.
fn disassembly_line(pc: u16, opcode: u8) -> String {
    format!("${pc:04X}  {opcode:02X}  ??? (illegal)")
}

/// Hex dump of the 16-byte memory line containing `pc`.
fn memory_line(bus: &dyn Bus, pc: u16) -> String {
    let start = pc & 0xFFF0;
    let mut out = String::new();
    let _ = write!(out, "${start:04X}:");
    for offset in 0..16 {
        let _ = write!(out, " {:02X}", bus.peek(start.wrapping_add(offset)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu64_core::SimpleBus;

    fn make_cpu() -> Mos6510 {
        Mos6510::new().expect("instruction table should build")
    }

    /// Load a program at $0200 and point PC there.
    fn setup(bus: &mut SimpleBus, cpu: &mut Mos6510, program: &[u8]) {
        bus.load(0x0200, program);
        cpu.regs.pc = 0x0200;
    }

    #[test]
    fn lda_immediate_sets_flags() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0xA9, 0x00]);

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 2);
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.p.is_set(Z));
        assert!(!cpu.regs.p.is_set(N));
    }

    #[test]
    fn sta_absolute_writes_memory() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // LDA #$42; STA $0200 → memory[$0200]=0x42, cycles 2+4
        setup(&mut bus, &mut cpu, &[0xA9, 0x42, 0x8D, 0x00, 0x02]);

        let c1 = cpu.step(&mut bus).unwrap();
        let c2 = cpu.step(&mut bus).unwrap();
        assert_eq!(c1 + c2, 6);
        assert_eq!(bus.peek(0x0200), 0x42);
    }

    #[test]
    fn adc_decimal_mode() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // SED; CLC; LDA #$15; ADC #$27 → A=$42
        setup(&mut bus, &mut cpu, &[0xF8, 0x18, 0xA9, 0x15, 0x69, 0x27]);

        for _ in 0..4 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.a, 0x42);
        assert!(!cpu.regs.p.is_set(C));
        assert!(!cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(Z));
    }

    #[test]
    fn sbc_decimal_mode() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // SED; SEC; LDA #$42; SBC #$27 → A=$15, C=1
        setup(&mut bus, &mut cpu, &[0xF8, 0x38, 0xA9, 0x42, 0xE9, 0x27]);

        for _ in 0..4 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.a, 0x15);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn adc_binary_overflow_flag() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // CLC; LDA #$50; ADC #$50 → A=$A0, V=1, N=1
        setup(&mut bus, &mut cpu, &[0x18, 0xA9, 0x50, 0x69, 0x50]);

        for _ in 0..3 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.a, 0xA0);
        assert!(cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn jmp_indirect_page_bug() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // JMP ($02FF) with $02FF=$00 and $0200=$30 → PC=$3000, not $0030.
        bus.write(0x02FF, 0x00);
        bus.write(0x0200, 0x30);
        bus.write(0x0300, 0xFF); // would be the high byte without the bug
        bus.load(0x0400, &[0x6C, 0xFF, 0x02]);
        cpu.regs.pc = 0x0400;

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 5);
        assert_eq!(cpu.regs.pc, 0x3000);
    }

    #[test]
    fn reset_loads_vector() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        bus.write(0xFFFC, 0x00);
        bus.write(0xFFFD, 0xE0);
        cpu.regs.cycles = 999;

        cpu.reset(&mut bus);
        assert_eq!(cpu.regs.pc, 0xE000);
        assert_eq!(cpu.regs.cycles, 0);
        assert!(cpu.regs.p.is_set(I));
    }

    #[test]
    fn page_cross_charges_extra_cycle() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        // LDA $02F0,X with X=$20 crosses into $0310: 4+1 cycles
        setup(&mut bus, &mut cpu, &[0xBD, 0xF0, 0x02]);
        cpu.regs.x = 0x20;
        bus.write(0x0310, 0x77);

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 5);
        assert_eq!(cpu.regs.a, 0x77);
    }

    #[test]
    fn no_page_cross_no_extra_cycle() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0xBD, 0x00, 0x03]);
        cpu.regs.x = 0x20;

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 4);
    }

    #[test]
    fn branch_cycle_accounting() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();

        // Not taken: 2 cycles
        setup(&mut bus, &mut cpu, &[0xD0, 0x10]); // BNE +16
        cpu.regs.p.set(Z);
        assert_eq!(cpu.step(&mut bus).unwrap(), 2);

        // Taken, same page: 3 cycles
        setup(&mut bus, &mut cpu, &[0xD0, 0x10]);
        cpu.regs.p.clear(Z);
        assert_eq!(cpu.step(&mut bus).unwrap(), 3);
        assert_eq!(cpu.regs.pc, 0x0212);

        // Taken, crossing a page: 4 cycles. Branch from $02F0 forward.
        bus.load(0x02F0, &[0xD0, 0x20]); // BNE +32 → $0312
        cpu.regs.pc = 0x02F0;
        assert_eq!(cpu.step(&mut bus).unwrap(), 4);
        assert_eq!(cpu.regs.pc, 0x0312);
    }

    #[test]
    fn rmw_accumulator_mode() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0x0A]); // ASL A
        cpu.regs.a = 0x81;

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 2);
        assert_eq!(cpu.regs.a, 0x02);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn rmw_memory_mode() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0xE6, 0x10]); // INC $10
        bus.write(0x0010, 0xFF);

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 5);
        assert_eq!(bus.peek(0x0010), 0x00);
        assert!(cpu.regs.p.is_set(Z));
    }

    #[test]
    fn stack_wraps_within_page_one() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        cpu.regs.sp = 0x00;
        cpu.push(&mut bus, 0xAB);
        assert_eq!(cpu.regs.sp, 0xFF);
        assert_eq!(bus.peek(0x0100), 0xAB);
        assert_eq!(cpu.pull(&mut bus), 0xAB);
        assert_eq!(cpu.regs.sp, 0x00);
    }

    #[test]
    fn brk_vectors_and_stack_layout() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x03);
        setup(&mut bus, &mut cpu, &[0x00, 0xEA]); // BRK; padding
        cpu.regs.sp = 0xFF;
        cpu.regs.p.clear(I);

        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 7);
        assert_eq!(cpu.regs.pc, 0x0300);
        assert!(cpu.regs.p.is_set(I));
        assert_eq!(cpu.regs.sp, 0xFC);
        // Pushed: PCH, PCL (= $0202, past the padding byte), P with B set
        assert_eq!(bus.peek(0x01FF), 0x02);
        assert_eq!(bus.peek(0x01FE), 0x02);
        assert_eq!(bus.peek(0x01FD) & B, B);
    }

    #[test]
    fn irq_respects_interrupt_disable() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x03);
        setup(&mut bus, &mut cpu, &[0xEA, 0xEA]);

        // I set: the IRQ is ignored
        cpu.regs.p.set(I);
        cpu.signal_irq();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x0201);

        // I clear: serviced before the next instruction
        cpu.regs.p.clear(I);
        cpu.signal_irq();
        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 7);
        assert_eq!(cpu.regs.pc, 0x0300);
        // B is clear in the pushed status
        assert_eq!(bus.peek(0x0100 | u16::from(cpu.regs.sp.wrapping_add(1))) & B, 0);
    }

    #[test]
    fn nmi_is_unconditional() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        bus.write(0xFFFA, 0x00);
        bus.write(0xFFFB, 0x04);
        setup(&mut bus, &mut cpu, &[0xEA]);

        cpu.regs.p.set(I);
        cpu.signal_nmi();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x0400);
    }

    #[test]
    fn rti_restores_state() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x03);
        bus.load(0x0300, &[0x40]); // RTI at the handler
        setup(&mut bus, &mut cpu, &[0x00, 0xEA, 0xA9, 0x01]); // BRK; pad; LDA #$01
        cpu.regs.p.clear(I);

        cpu.step(&mut bus).unwrap(); // BRK
        cpu.step(&mut bus).unwrap(); // RTI
        assert_eq!(cpu.regs.pc, 0x0202, "RTI returns past the padding byte");
        assert!(!cpu.regs.p.is_set(I), "RTI restores the pushed I state");
    }

    #[test]
    fn illegal_opcode_reports_diagnostic() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0x02]); // JAM

        let err = cpu.step(&mut bus).unwrap_err();
        let text = err.to_string();
        // Register dump, disassembly line and memory window all present
        assert!(text.contains("PC=$0200"), "{text}");
        assert!(text.contains("$0200  02  ??? (illegal)"), "{text}");
        assert!(text.contains("$0200:"), "{text}");
    }

    #[test]
    fn cycle_counter_accumulates() {
        let mut bus = SimpleBus::new();
        let mut cpu = make_cpu();
        setup(&mut bus, &mut cpu, &[0xA9, 0x42, 0x8D, 0x00, 0x02, 0x00]);
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x03);

        // LDA #$42 (2) + STA $0200 (4) + BRK (7) = 13
        for _ in 0..3 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.cycles, 13);
    }
}

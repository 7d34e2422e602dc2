//! Addressing-mode resolution and stack traffic.
//!
//! All helpers take the bus as a borrowed parameter; the CPU owns PC and
//! advances it as operand bytes are consumed. Indexed modes report page
//! crossings so the dispatcher can charge the extra cycle where the
//! hardware does.

use emu64_core::Bus;

use crate::cpu::Mos6510;
use crate::opcodes::AddrMode;

impl Mos6510 {
    /// Fetch the byte at PC and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut dyn Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian word at PC and advance PC by two.
    pub(crate) fn fetch_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a little-endian word from memory.
    pub(crate) fn read_word(&self, bus: &mut dyn Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Read a word with the 6502 page-boundary bug: if `addr` is $xxFF the
    /// high byte comes from $xx00, not the next page.
    pub(crate) fn read_word_page_bug(&self, bus: &mut dyn Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack at $0100+SP, post-decrementing SP.
    pub(crate) fn push(&mut self, bus: &mut dyn Bus, value: u8) {
        bus.write(self.regs.stack_addr(), value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    /// Pull a byte from the stack, pre-incrementing SP.
    pub(crate) fn pull(&mut self, bus: &mut dyn Bus) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        bus.read(self.regs.stack_addr())
    }

    /// Push a word, high byte first.
    pub(crate) fn push_word(&mut self, bus: &mut dyn Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    /// Pull a word, low byte first.
    pub(crate) fn pull_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Zero page: $nn
    fn addr_zero_page(&mut self, bus: &mut dyn Bus) -> u16 {
        u16::from(self.fetch(bus))
    }

    /// Zero page,X: $nn,X - wraps within page zero.
    fn addr_zero_page_x(&mut self, bus: &mut dyn Bus) -> u16 {
        let base = self.fetch(bus);
        u16::from(base.wrapping_add(self.regs.x))
    }

    /// Zero page,Y: $nn,Y - wraps within page zero.
    fn addr_zero_page_y(&mut self, bus: &mut dyn Bus) -> u16 {
        let base = self.fetch(bus);
        u16::from(base.wrapping_add(self.regs.y))
    }

    /// Absolute: $nnnn
    fn addr_absolute(&mut self, bus: &mut dyn Bus) -> u16 {
        self.fetch_word(bus)
    }

    /// Absolute,X. Returns `(address, page_crossed)`.
    fn addr_absolute_x(&mut self, bus: &mut dyn Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.regs.x));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Absolute,Y. Returns `(address, page_crossed)`.
    fn addr_absolute_y(&mut self, bus: &mut dyn Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.regs.y));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Indexed indirect ($nn,X): pointer at zero page operand+X, wrapping
    /// within page zero.
    fn addr_indexed_indirect(&mut self, bus: &mut dyn Bus) -> u16 {
        let ptr = self.fetch(bus).wrapping_add(self.regs.x);
        let low = bus.read(u16::from(ptr));
        let high = bus.read(u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([low, high])
    }

    /// Indirect indexed ($nn),Y. Returns `(address, page_crossed)`.
    fn addr_indirect_indexed(&mut self, bus: &mut dyn Bus) -> (u16, bool) {
        let ptr = self.fetch(bus);
        let low = bus.read(u16::from(ptr));
        let high = bus.read(u16::from(ptr.wrapping_add(1)));
        let base = u16::from_le_bytes([low, high]);
        let addr = base.wrapping_add(u16::from(self.regs.y));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Resolve a read-instruction operand: the value, and whether a page
    /// was crossed (the dispatcher charges +1 cycle for that on the
    /// indexed modes).
    ///
    /// `Relative` resolves to the raw displacement byte; the branch
    /// handlers interpret it.
    pub(crate) fn read_operand(&mut self, bus: &mut dyn Bus, mode: AddrMode) -> (u8, bool) {
        match mode {
            AddrMode::Immediate | AddrMode::Relative => (self.fetch(bus), false),
            AddrMode::ZeroPage => {
                let addr = self.addr_zero_page(bus);
                (bus.read(addr), false)
            }
            AddrMode::ZeroPageX => {
                let addr = self.addr_zero_page_x(bus);
                (bus.read(addr), false)
            }
            AddrMode::ZeroPageY => {
                let addr = self.addr_zero_page_y(bus);
                (bus.read(addr), false)
            }
            AddrMode::Absolute => {
                let addr = self.addr_absolute(bus);
                (bus.read(addr), false)
            }
            AddrMode::AbsoluteX => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                (bus.read(addr), crossed)
            }
            AddrMode::AbsoluteY => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                (bus.read(addr), crossed)
            }
            AddrMode::IndexedIndirectX => {
                let addr = self.addr_indexed_indirect(bus);
                (bus.read(addr), false)
            }
            AddrMode::IndirectIndexedY => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                (bus.read(addr), crossed)
            }
            // The table never pairs these modes with a read handler.
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Indirect => {
                unreachable!("read operand with mode {mode:?}")
            }
        }
    }

    /// Resolve a read-modify-write target address. RMW and store costs are
    /// fixed table data, so no page-crossing is reported.
    pub(crate) fn operand_address(&mut self, bus: &mut dyn Bus, mode: AddrMode) -> u16 {
        match mode {
            AddrMode::ZeroPage => self.addr_zero_page(bus),
            AddrMode::ZeroPageX => self.addr_zero_page_x(bus),
            AddrMode::ZeroPageY => self.addr_zero_page_y(bus),
            AddrMode::Absolute => self.addr_absolute(bus),
            AddrMode::AbsoluteX => self.addr_absolute_x(bus).0,
            AddrMode::AbsoluteY => self.addr_absolute_y(bus).0,
            AddrMode::IndexedIndirectX => self.addr_indexed_indirect(bus),
            AddrMode::IndirectIndexedY => self.addr_indirect_indexed(bus).0,
            AddrMode::Implied
            | AddrMode::Accumulator
            | AddrMode::Immediate
            | AddrMode::Relative
            | AddrMode::Indirect => {
                unreachable!("modify operand with mode {mode:?}")
            }
        }
    }
}

//! C64 bus: memory and I/O routing.
//!
//! Implements `emu64_core::Bus`. The C64 is fully memory-mapped; the bus
//! applies the banking rules and, when the I/O window is visible,
//! dispatches $D000-$DFFF to the VIC, SID stub, colour RAM, CIAs and the
//! expansion areas.

#![allow(clippy::cast_possible_truncation)]

use emu64_core::Bus;
use log::debug;

use crate::cia::Cia;
use crate::keyboard::KeyboardMatrix;
use crate::memory::C64Memory;
use crate::sid::Sid;
use crate::vic::Vic;

/// The C64 bus. Owns every subsystem the CPU can address.
pub struct C64Bus {
    pub memory: C64Memory,
    pub vic: Vic,
    pub sid: Sid,
    pub cia1: Cia,
    pub cia2: Cia,
    pub keyboard: KeyboardMatrix,
}

impl C64Bus {
    #[must_use]
    pub fn new(memory: C64Memory) -> Self {
        let mut bus = Self {
            memory,
            vic: Vic::new(),
            sid: Sid::new(),
            cia1: Cia::new(),
            cia2: Cia::new(),
            keyboard: KeyboardMatrix::new(),
        };
        bus.configure_cias();
        bus
    }

    /// Power-on CIA port setup: CIA1 scans the keyboard (port A output
    /// strobe, port B input sense), CIA2 port A drives the VIC bank.
    fn configure_cias(&mut self) {
        self.cia1.write(0x02, 0xFF); // DDR A: all output
        self.cia1.write(0x03, 0x00); // DDR B: all input
        self.cia1.write(0x00, 0xFF); // no rows selected

        self.cia2.write(0x02, 0x03); // DDR A: bits 0-1 output
        self.cia2.write(0x00, 0x03); // %11 inverted → bank 0
        self.update_vic_bank();
    }

    /// Recompute the VIC bank from CIA2 port A (low two bits, inverted).
    pub fn update_vic_bank(&mut self) {
        let pa = self.cia2.port_a_output();
        self.vic.set_bank(!pa & 0x03);
    }

    /// Reset every subsystem to power-on state.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.vic.reset();
        self.sid.reset();
        self.cia1.reset();
        self.cia2.reset();
        self.keyboard.release_all();
        self.configure_cias();
    }
}

impl Bus for C64Bus {
    fn read(&mut self, addr: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            return match addr {
                0xD000..=0xD3FF => self.vic.read((addr & 0x3F) as u8),
                0xD400..=0xD7FF => self.sid.read((addr & 0x1F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
                0xDC00..=0xDCFF => {
                    let reg = (addr & 0x0F) as u8;
                    if reg == 0x0D {
                        self.cia1.read_icr_and_clear()
                    } else {
                        self.cia1.read_with_keyboard(reg, &self.keyboard)
                    }
                }
                0xDD00..=0xDDFF => {
                    let reg = (addr & 0x0F) as u8;
                    if reg == 0x0D {
                        self.cia2.read_icr_and_clear()
                    } else {
                        self.cia2.read(reg)
                    }
                }
                // I/O expansion: no device mapped
                _ => {
                    debug!("read from unmapped I/O expansion ${addr:04X}");
                    0
                }
            };
        }

        self.memory.cpu_read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        // Writes always land in RAM (or the 6510 port).
        self.memory.cpu_write(addr, value);

        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            match addr {
                0xD000..=0xD3FF => self.vic.write((addr & 0x3F) as u8, value),
                0xD400..=0xD7FF => self.sid.write((addr & 0x1F) as u8, value),
                0xD800..=0xDBFF => self.memory.colour_ram_write(addr - 0xD800, value),
                0xDC00..=0xDCFF => self.cia1.write((addr & 0x0F) as u8, value),
                0xDD00..=0xDDFF => {
                    let reg = (addr & 0x0F) as u8;
                    self.cia2.write(reg, value);
                    // Port A or its DDR moves the VIC bank
                    if reg == 0x00 || reg == 0x02 {
                        self.update_vic_bank();
                    }
                }
                _ => {
                    debug!("write to unmapped I/O expansion ${addr:04X} = ${value:02X}");
                }
            }
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            return match addr {
                0xD000..=0xD3FF => self.vic.peek((addr & 0x3F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
                0xDC00..=0xDCFF => self.cia1.read((addr & 0x0F) as u8),
                0xDD00..=0xDDFF => self.cia2.read((addr & 0x0F) as u8),
                _ => 0,
            };
        }
        self.memory.peek(addr)
    }
}

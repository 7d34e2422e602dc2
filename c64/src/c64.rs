//! Top-level C64 system.
//!
//! The CPU is the master: each step runs one instruction, then the
//! VIC-II catches up to the cumulative cycle count, then the CIAs tick
//! at wall-clock microsecond granularity, then pending interrupt lines
//! are routed into the CPU.

use std::time::Instant;

use mos_6510::{ExecutionError, Mos6510};

use crate::bus::C64Bus;
use crate::config::C64Config;
use crate::input::C64Key;
use crate::memory::C64Memory;
use crate::ConfigError;

/// Upper bound of CIA ticks applied in a single step, so a paused or
/// suspended process cannot unleash a burst of timer underflows.
const MAX_CIA_TICKS_PER_STEP: u128 = 1_000;

/// C64 system: CPU + bus, stepped instruction by instruction.
pub struct C64 {
    cpu: Mos6510,
    bus: C64Bus,
    /// Wall-clock anchor for the coarse CIA tick.
    cia_anchor: Option<Instant>,
    /// Microseconds already delivered to the CIAs since the anchor.
    cia_ticks_done: u128,
    /// Previous CIA2 interrupt line state, for NMI edge detection.
    nmi_line: bool,
}

impl C64 {
    /// Build a machine from ROM images and apply the hardware reset.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] on bad ROM sizes or an inconsistent CPU
    /// instruction table.
    pub fn new(config: &C64Config) -> Result<Self, ConfigError> {
        let memory = C64Memory::new(&config.kernal_rom, &config.basic_rom, &config.char_rom)?;
        let mut bus = C64Bus::new(memory);

        let mut cpu = Mos6510::new()?;
        cpu.reset(&mut bus);

        Ok(Self {
            cpu,
            bus,
            cia_anchor: None,
            cia_ticks_done: 0,
            nmi_line: false,
        })
    }

    /// Execute one instruction and bring the rest of the machine up to
    /// date. Returns the cycles the instruction took.
    ///
    /// # Errors
    ///
    /// Propagates [`ExecutionError`] from the CPU; the machine makes no
    /// recovery attempt below the run loop.
    pub fn step(&mut self) -> Result<u32, ExecutionError> {
        let cycles = self.cpu.step(&mut self.bus)?;

        // The VIC observes CPU state exactly at this instruction boundary.
        let bus = &mut self.bus;
        bus.vic.refresh(self.cpu.regs.cycles, &bus.memory);

        self.tick_cias();

        // Level-triggered IRQ from VIC or CIA1; edge-triggered NMI from CIA2.
        if self.bus.vic.irq_active() || self.bus.cia1.irq_active() {
            self.cpu.signal_irq();
        }
        let nmi = self.bus.cia2.irq_active();
        if nmi && !self.nmi_line {
            self.cpu.signal_nmi();
        }
        self.nmi_line = nmi;

        Ok(cycles)
    }

    /// Deliver one CIA tick per elapsed wall-clock microsecond.
    fn tick_cias(&mut self) {
        let now = Instant::now();
        let anchor = *self.cia_anchor.get_or_insert(now);
        let elapsed = now.duration_since(anchor).as_micros();
        let due = elapsed
            .saturating_sub(self.cia_ticks_done)
            .min(MAX_CIA_TICKS_PER_STEP);
        for _ in 0..due {
            self.bus.cia1.cycle();
            self.bus.cia2.cycle();
        }
        self.cia_ticks_done += due;
    }

    /// Run until the raster wraps (one complete frame). Returns the
    /// cycles executed during the frame.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ExecutionError`]; the frame buffer keeps
    /// whatever was painted up to the fault.
    pub fn run_frame(&mut self) -> Result<u64, ExecutionError> {
        let start = self.cpu.regs.cycles;
        loop {
            self.step()?;
            if self.bus.vic.take_frame_complete() {
                break;
            }
        }
        Ok(self.cpu.regs.cycles - start)
    }

    /// Hardware reset: memory, I/O chips and CPU back to power-on state,
    /// PC from the Kernal reset vector, $0000/$0001 hardwired.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.cia_anchor = None;
        self.cia_ticks_done = 0;
        self.nmi_line = false;
    }

    /// The RGB frame buffer (3 bytes per pixel).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.vic.framebuffer()
    }

    /// Frame buffer width in pixels.
    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        self.bus.vic.framebuffer_width()
    }

    /// Frame buffer height in pixels.
    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        self.bus.vic.framebuffer_height()
    }

    /// Press a key in the keyboard matrix.
    pub fn press_key(&mut self, key: C64Key) {
        let (row, col) = key.matrix();
        self.bus.keyboard.set_key(row, col, true);
    }

    /// Release a key.
    pub fn release_key(&mut self, key: C64Key) {
        let (row, col) = key.matrix();
        self.bus.keyboard.set_key(row, col, false);
    }

    /// Release every key.
    pub fn release_all_keys(&mut self) {
        self.bus.keyboard.release_all();
    }

    /// Load a PRG image into RAM.
    ///
    /// # Errors
    ///
    /// [`ConfigError::PrgTooShort`] for a malformed header.
    pub fn load_prg(&mut self, data: &[u8]) -> Result<u16, ConfigError> {
        crate::prg::load_prg(&mut self.bus.memory, data)
    }

    /// Reference to the CPU.
    #[must_use]
    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    /// Mutable reference to the CPU.
    pub fn cpu_mut(&mut self) -> &mut Mos6510 {
        &mut self.cpu
    }

    /// Reference to the bus.
    #[must_use]
    pub fn bus(&self) -> &C64Bus {
        &self.bus
    }

    /// Mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut C64Bus {
        &mut self.bus
    }
}

//! VIC-II 6569 (PAL) video chip.
//!
//! A scan-line rasterizer driven by the CPU's cumulative cycle counter.
//! After every instruction the machine calls [`Vic::refresh`], which maps
//! the cycle count to a raster position; each time the raster line
//! advances, the completed line is painted into the frame buffer in one
//! pass.
//!
//! # Timing (PAL)
//!
//! - 312 raster lines per frame, 63 CPU cycles per line
//! - 19,656 CPU cycles per frame (~50.12 Hz)
//! - 504 raster columns per line (63 cycles x 8 pixels)
//!
//! # Frame buffer
//!
//! The visible window excluding blanking: 405 x 284 pixels, 3 bytes RGB
//! per pixel. The display reader consumes it asynchronously; whole-frame
//! tearing is acceptable.
//!
//! # Register file
//!
//! 64 bytes, mirrored through $D3FF by masking the address with $3F.
//! Reads return the last-written value except the live raster position
//! ($D011 bit 7 / $D012) and the collision latches ($D01E/$D01F), which
//! the rasterizer maintains and which clear on read.

#![allow(clippy::cast_possible_truncation)]

use log::warn;

use crate::memory::C64Memory;
use crate::palette::PALETTE;

/// Total raster lines per PAL frame.
pub const LINES_PER_FRAME: u16 = 312;

/// CPU cycles per raster line (PAL).
pub const CYCLES_PER_RASTERLINE: u64 = 63;

/// CPU cycles per frame.
pub const CYCLES_PER_FRAME: u64 = LINES_PER_FRAME as u64 * CYCLES_PER_RASTERLINE;

/// First visible raster line (top border start); lines 0-15 are blanking.
const BORDER_TOP: u16 = 16;

/// Last visible raster line; lines 300-311 are blanking.
const BORDER_BOTTOM: u16 = 299;

/// First visible raster column; columns 0-75 are blanking.
const BORDER_LEFT: u16 = 76;

/// Last visible raster column; columns 481-503 are blanking.
const BORDER_RIGHT: u16 = 480;

/// Display window rows (25-row mode).
const DISPLAY_TOP: u16 = 51;
const DISPLAY_BOTTOM: u16 = 250;

/// Display window columns (40-column mode).
const DISPLAY_LEFT: u16 = 124;
const DISPLAY_RIGHT: u16 = 443;

/// Frame buffer width in pixels.
pub const FB_WIDTH: usize = (BORDER_RIGHT - BORDER_LEFT + 1) as usize;

/// Frame buffer height in pixels.
pub const FB_HEIGHT: usize = (BORDER_BOTTOM - BORDER_TOP + 1) as usize;

/// Display window width in pixels.
const DISPLAY_WIDTH: usize = (DISPLAY_RIGHT - DISPLAY_LEFT + 1) as usize;

/// Sprite coordinate origin: X=24/Y=50 is the display window's top-left.
const SPRITE_X_ORIGIN: i32 = 24;
const SPRITE_Y_ORIGIN: i32 = 50;

// Register offsets within the $D0xx file.
const REG_SPRITE_X_MSB: usize = 0x10;
const REG_CTRL1: usize = 0x11; // SCROLY: bitmap, DEN, RSEL, yscroll
const REG_RASTER: usize = 0x12;
const REG_SPRITE_ENABLE: usize = 0x15;
const REG_CTRL2: usize = 0x16; // SCROLX: multicolor, CSEL, xscroll
const REG_SPRITE_Y_EXPAND: usize = 0x17;
const REG_VMCSB: usize = 0x18;
const REG_IRQ_STATUS: usize = 0x19;
const REG_IRQ_ENABLE: usize = 0x1A;
const REG_SPRITE_PRIORITY: usize = 0x1B;
const REG_SPRITE_MC: usize = 0x1C;
const REG_SPRITE_X_EXPAND: usize = 0x1D;
const REG_SS_COLLISION: usize = 0x1E;
const REG_SB_COLLISION: usize = 0x1F;
const REG_BORDER: usize = 0x20;
const REG_BG0: usize = 0x21;
const REG_SPRITE_MC0: usize = 0x25;
const REG_SPRITE_MC1: usize = 0x26;
const REG_SPRITE_COLOUR0: usize = 0x27;

/// Where character pattern bytes come from for the current line.
///
/// Recomputed per scan line from VMCSB and the video bank: character ROM
/// is visible to the VIC at $1000-$1FFF in banks 0 and 2.
#[derive(Debug, Clone, Copy)]
enum CharFetch {
    /// Fetch from character ROM at the given ROM offset.
    CharRom { base: u16 },
    /// Fetch from the active video bank at the given bank offset.
    VideoBank { base: u16 },
}

impl CharFetch {
    fn fetch(self, memory: &C64Memory, bank: u8, code: u8, row: u8) -> u8 {
        let offset = u16::from(code) * 8 + u16::from(row);
        match self {
            Self::CharRom { base } => memory.char_rom_read(base + offset),
            Self::VideoBank { base } => memory.vic_read(bank, base.wrapping_add(offset)),
        }
    }
}

/// Display mode for the current line, from the CTRL1/CTRL2 mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    HiresBitmap,
    MulticolourBitmap,
}

/// VIC-II 6569 PAL chip.
pub struct Vic {
    /// Register file, mirrored with `addr & 0x3F`.
    regs: [u8; 0x40],

    /// Last raster line derived from the cycle counter.
    last_raster_line: u16,

    /// Raster compare value ($D012 + bit 7 of $D011).
    raster_compare: u16,

    /// IRQ status ($D019) and enable mask ($D01A), low 4 bits.
    irq_status: u8,
    irq_enable: u8,

    /// Sprite-sprite collision latch ($D01E), clear-on-read.
    sprite_sprite_collision: u8,
    /// Sprite-background collision latch ($D01F), clear-on-read.
    sprite_bg_collision: u8,

    /// VIC bank 0-3, from CIA2 port A (inverted).
    video_bank: u8,

    /// Set when the raster wraps to line 0; taken by the run loop.
    frame_complete: bool,

    /// RGB frame buffer, 3 bytes per pixel, 405 x 284.
    framebuffer: Vec<u8>,
}

impl Vic {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; 0x40],
            last_raster_line: 0,
            raster_compare: 0,
            irq_status: 0,
            irq_enable: 0,
            sprite_sprite_collision: 0,
            sprite_bg_collision: 0,
            video_bank: 0,
            frame_complete: false,
            framebuffer: vec![0; FB_WIDTH * FB_HEIGHT * 3],
        }
    }

    /// Reset registers and raster state; the frame buffer keeps its last
    /// contents (the display holds the final frame on a fault).
    pub fn reset(&mut self) {
        self.regs = [0; 0x40];
        self.last_raster_line = 0;
        self.raster_compare = 0;
        self.irq_status = 0;
        self.irq_enable = 0;
        self.sprite_sprite_collision = 0;
        self.sprite_bg_collision = 0;
        self.video_bank = 0;
        self.frame_complete = false;
    }

    /// Advance the raster to the position implied by the CPU's cumulative
    /// cycle count.
    ///
    /// When the raster line changes, the new line number is latched into
    /// $D012/$D011 bit 7, the completed previous line is rasterized, and
    /// the raster-compare interrupt is evaluated.
    pub fn refresh(&mut self, cycles: u64, memory: &C64Memory) {
        let line = ((cycles % CYCLES_PER_FRAME) / CYCLES_PER_RASTERLINE) as u16;
        if line == self.last_raster_line {
            return;
        }

        self.latch_raster(line);
        let finished = self.last_raster_line;
        self.rasterize_line(finished, memory);
        self.last_raster_line = line;

        if line == 0 {
            self.frame_complete = true;
        }
        if line == self.raster_compare {
            self.irq_status |= 0x01;
        }
    }

    /// Latch the current raster line into the register file.
    fn latch_raster(&mut self, line: u16) {
        self.regs[REG_RASTER] = (line & 0xFF) as u8;
        let msb = if line & 0x100 != 0 { 0x80 } else { 0x00 };
        self.regs[REG_CTRL1] = (self.regs[REG_CTRL1] & 0x7F) | msb;
    }

    /// Paint one completed raster line into the frame buffer.
    fn rasterize_line(&mut self, line: u16, memory: &C64Memory) {
        if !(BORDER_TOP..=BORDER_BOTTOM).contains(&line) {
            return; // vertical blanking
        }
        let fb_y = (line - BORDER_TOP) as usize;

        let ctrl1 = self.regs[REG_CTRL1];
        let ctrl2 = self.regs[REG_CTRL2];
        let den = ctrl1 & 0x10 != 0;
        let border = PALETTE[(self.regs[REG_BORDER] & 0x0F) as usize];
        let scroll_x = (ctrl2 & 0x07) as usize;

        // RSEL/CSEL shrink the window; the border overlays the edges.
        let (top, bottom) = if ctrl1 & 0x08 != 0 {
            (DISPLAY_TOP, DISPLAY_BOTTOM)
        } else {
            (DISPLAY_TOP + 4, DISPLAY_BOTTOM - 4)
        };
        let (left, right) = if ctrl2 & 0x08 != 0 {
            (DISPLAY_LEFT, DISPLAY_RIGHT)
        } else {
            (DISPLAY_LEFT + 7, DISPLAY_RIGHT - 9)
        };

        let in_display_line = den && (top..=bottom).contains(&line);

        let mode = match (ctrl1 & 0x20 != 0, ctrl2 & 0x10 != 0) {
            (false, _) => Mode::Text,
            (true, false) => Mode::HiresBitmap,
            (true, true) => Mode::MulticolourBitmap,
        };

        // Derived state, recomputed per scan line.
        let bank = self.video_bank;
        let screen_base = self.screen_base();
        let bitmap_base = self.bitmap_base();
        let char_fetch = self.char_fetch_source();

        // Foreground coverage across the display window, for sprite
        // priority and sprite-background collisions.
        let mut foreground = [false; DISPLAY_WIDTH];

        // Every selected colour lands at (col - BORDER_LEFT + scroll_x).
        // The first scroll_x columns have no source column; they show the
        // border so no framebuffer column goes stale.
        for fill in 0..scroll_x {
            self.put_pixel(fill, fb_y, border);
        }

        for col in BORDER_LEFT..=BORDER_RIGHT {
            let fb_x = (col - BORDER_LEFT) as usize + scroll_x;
            if fb_x >= FB_WIDTH {
                break;
            }

            if !in_display_line || !(left..=right).contains(&col) {
                self.put_pixel(fb_x, fb_y, border);
                continue;
            }

            // Cell addressing always counts from the 40-column origin so
            // 38-column mode clips without shifting the image.
            let x = (col - DISPLAY_LEFT) as usize;
            let row = (line - DISPLAY_TOP) as usize;
            let (rgb, is_fg) = match mode {
                Mode::Text => {
                    self.text_pixel(memory, bank, screen_base, char_fetch, x, row)
                }
                Mode::HiresBitmap => {
                    self.hires_pixel(memory, bank, screen_base, bitmap_base, x, row)
                }
                Mode::MulticolourBitmap => {
                    self.multicolour_pixel(memory, bank, screen_base, bitmap_base, x, row)
                }
            };
            foreground[x] = is_fg;
            self.put_pixel(fb_x, fb_y, rgb);
        }

        if in_display_line {
            self.overlay_sprites(line, fb_y, memory, bank, screen_base, scroll_x, &foreground);
        }
    }

    /// Standard text mode: screen code → character pattern, colour RAM
    /// nibble as foreground over BGCOL0.
    fn text_pixel(
        &self,
        memory: &C64Memory,
        bank: u8,
        screen_base: u16,
        char_fetch: CharFetch,
        x: usize,
        row: usize,
    ) -> ((u8, u8, u8), bool) {
        let cell = (row / 8) * 40 + x / 8;
        let code = memory.vic_read(bank, screen_base.wrapping_add(cell as u16));
        let colour = memory.colour_ram_read(cell as u16);
        let pattern = char_fetch.fetch(memory, bank, code, (row & 7) as u8);

        let bit = pattern >> (7 - (x & 7)) & 1;
        if bit != 0 {
            (PALETTE[(colour & 0x0F) as usize], true)
        } else {
            (PALETTE[(self.regs[REG_BG0] & 0x0F) as usize], false)
        }
    }

    /// Hires bitmap: the screen byte's high nibble is the set-pixel
    /// colour, the low nibble the clear-pixel colour.
    fn hires_pixel(
        &self,
        memory: &C64Memory,
        bank: u8,
        screen_base: u16,
        bitmap_base: u16,
        x: usize,
        row: usize,
    ) -> ((u8, u8, u8), bool) {
        let cell = (row / 8) * 40 + x / 8;
        let screen_byte = memory.vic_read(bank, screen_base.wrapping_add(cell as u16));
        let pattern_addr = bitmap_base
            .wrapping_add(((row / 8) * 320 + (x / 8) * 8 + (row & 7)) as u16);
        let pattern = memory.vic_read(bank, pattern_addr);

        let bit = pattern >> (7 - (x & 7)) & 1;
        if bit != 0 {
            (PALETTE[(screen_byte >> 4) as usize], true)
        } else {
            (PALETTE[(screen_byte & 0x0F) as usize], false)
        }
    }

    /// Multicolour bitmap: bit pairs at half horizontal resolution.
    /// 00 = BGCOL0, 01 = screen high nibble, 10 = screen low nibble,
    /// 11 = colour RAM nibble.
    fn multicolour_pixel(
        &self,
        memory: &C64Memory,
        bank: u8,
        screen_base: u16,
        bitmap_base: u16,
        x: usize,
        row: usize,
    ) -> ((u8, u8, u8), bool) {
        let cell = (row / 8) * 40 + x / 8;
        let screen_byte = memory.vic_read(bank, screen_base.wrapping_add(cell as u16));
        let colour = memory.colour_ram_read(cell as u16);
        let pattern_addr = bitmap_base
            .wrapping_add(((row / 8) * 320 + (x / 8) * 8 + (row & 7)) as u16);
        let pattern = memory.vic_read(bank, pattern_addr);

        let pair = (x & 7) / 2;
        let bits = pattern >> (6 - pair * 2) & 0x03;
        let rgb = match bits {
            0b00 => PALETTE[(self.regs[REG_BG0] & 0x0F) as usize],
            0b01 => PALETTE[(screen_byte >> 4) as usize],
            0b10 => PALETTE[(screen_byte & 0x0F) as usize],
            _ => PALETTE[(colour & 0x0F) as usize],
        };
        (rgb, bits != 0b00)
    }

    /// Composite the eight sprites over the display window portion of the
    /// completed line. Painted 7 → 0 so sprite 0 lands topmost.
    fn overlay_sprites(
        &mut self,
        line: u16,
        fb_y: usize,
        memory: &C64Memory,
        bank: u8,
        screen_base: u16,
        scroll_x: usize,
        foreground: &[bool; DISPLAY_WIDTH],
    ) {
        let enabled = self.regs[REG_SPRITE_ENABLE];
        if enabled == 0 {
            return;
        }

        let window_row = i32::from(line) - i32::from(DISPLAY_TOP);
        let mut coverage = [0u8; DISPLAY_WIDTH];
        let mc0 = PALETTE[(self.regs[REG_SPRITE_MC0] & 0x0F) as usize];
        let mc1 = PALETTE[(self.regs[REG_SPRITE_MC1] & 0x0F) as usize];

        for sprite in (0..8usize).rev() {
            let mask = 1u8 << sprite;
            if enabled & mask == 0 {
                continue;
            }

            let y_expand = self.regs[REG_SPRITE_Y_EXPAND] & mask != 0;
            let height = if y_expand { 42 } else { 21 };
            let sprite_y = i32::from(self.regs[1 + sprite * 2]);
            let row_in_sprite = window_row - (sprite_y - SPRITE_Y_ORIGIN);
            if !(0..height).contains(&row_in_sprite) {
                continue;
            }
            let data_row = (if y_expand {
                row_in_sprite / 2
            } else {
                row_in_sprite
            }) as u16;

            // 64-byte data block addressed by the pointer slot behind the
            // screen matrix.
            let pointer_addr = screen_base.wrapping_add(0x03F8 + sprite as u16);
            let pointer = memory.vic_read(bank, pointer_addr);
            let data_base = u16::from(pointer) * 64 + data_row * 3;
            let data = [
                memory.vic_read(bank, data_base),
                memory.vic_read(bank, data_base.wrapping_add(1)),
                memory.vic_read(bank, data_base.wrapping_add(2)),
            ];

            let msb = if self.regs[REG_SPRITE_X_MSB] & mask != 0 {
                256
            } else {
                0
            };
            let sprite_x = i32::from(self.regs[sprite * 2]) + msb;
            let x_expand = self.regs[REG_SPRITE_X_EXPAND] & mask != 0;
            let multicolour = self.regs[REG_SPRITE_MC] & mask != 0;
            let behind = self.regs[REG_SPRITE_PRIORITY] & mask != 0;
            let sprite_rgb =
                PALETTE[(self.regs[REG_SPRITE_COLOUR0 + sprite] & 0x0F) as usize];
            let width = if x_expand { 48 } else { 24 };

            for px in 0..width {
                let wx = sprite_x - SPRITE_X_ORIGIN + px;
                if !(0..DISPLAY_WIDTH as i32).contains(&wx) {
                    continue;
                }
                let data_pos = (if x_expand { px / 2 } else { px }) as usize;

                let rgb = if multicolour {
                    // Bit pairs, each covering two screen pixels.
                    let pair = data_pos / 2;
                    let bits = data[pair / 4] >> (6 - (pair % 4) * 2) & 0x03;
                    match bits {
                        0b00 => continue, // transparent
                        0b01 => mc0,
                        0b10 => sprite_rgb,
                        _ => mc1,
                    }
                } else {
                    if data[data_pos / 8] & (1 << (7 - data_pos % 8)) == 0 {
                        continue; // transparent
                    }
                    sprite_rgb
                };

                let wx = wx as usize;

                // Collisions latch at the overlapping pixel.
                if coverage[wx] != 0 {
                    self.sprite_sprite_collision |= coverage[wx] | mask;
                    self.irq_status |= 0x04;
                }
                coverage[wx] |= mask;
                if foreground[wx] {
                    self.sprite_bg_collision |= mask;
                    self.irq_status |= 0x02;
                    if behind {
                        continue;
                    }
                }

                let fb_x = (DISPLAY_LEFT - BORDER_LEFT) as usize + wx + scroll_x;
                if fb_x < FB_WIDTH {
                    self.put_pixel(fb_x, fb_y, rgb);
                }
            }
        }
    }

    fn put_pixel(&mut self, x: usize, y: usize, rgb: (u8, u8, u8)) {
        let idx = (y * FB_WIDTH + x) * 3;
        self.framebuffer[idx] = rgb.0;
        self.framebuffer[idx + 1] = rgb.1;
        self.framebuffer[idx + 2] = rgb.2;
    }

    /// Screen memory offset within the 16K video bank.
    fn screen_base(&self) -> u16 {
        u16::from(self.regs[REG_VMCSB] >> 4) * 0x0400
    }

    /// Character memory offset within the 16K video bank.
    fn char_base(&self) -> u16 {
        u16::from((self.regs[REG_VMCSB] & 0x0E) >> 1) * 0x0800
    }

    /// Bitmap base offset: $2000 when VMCSB bit 3 is set.
    fn bitmap_base(&self) -> u16 {
        if self.regs[REG_VMCSB] & 0x08 != 0 {
            0x2000
        } else {
            0x0000
        }
    }

    /// Character pattern source for the current line: character ROM when
    /// the base slot is 2 or 3 ($1000/$1800) and the bank is 0 or 2.
    fn char_fetch_source(&self) -> CharFetch {
        let slot = (self.regs[REG_VMCSB] & 0x0E) >> 1;
        let base = self.char_base();
        if (slot == 2 || slot == 3) && (self.video_bank == 0 || self.video_bank == 2) {
            CharFetch::CharRom { base: base - 0x1000 }
        } else {
            CharFetch::VideoBank { base }
        }
    }

    /// Read a VIC register. `&mut self` because the collision latches
    /// clear on read.
    pub fn read(&mut self, reg: u8) -> u8 {
        match (reg & 0x3F) as usize {
            REG_IRQ_STATUS => {
                let any = if self.irq_active() { 0x80 } else { 0x00 };
                self.irq_status | any
            }
            REG_IRQ_ENABLE => self.irq_enable,
            REG_SS_COLLISION => {
                let value = self.sprite_sprite_collision;
                self.sprite_sprite_collision = 0;
                value
            }
            REG_SB_COLLISION => {
                let value = self.sprite_bg_collision;
                self.sprite_bg_collision = 0;
                value
            }
            r if r <= 0x2E => self.regs[r],
            // Offsets past the register file read open-bus.
            _ => 0xFF,
        }
    }

    /// Read without side effects (observation, bus `peek`).
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        match (reg & 0x3F) as usize {
            REG_IRQ_STATUS => {
                let any = if self.irq_active() { 0x80 } else { 0x00 };
                self.irq_status | any
            }
            REG_IRQ_ENABLE => self.irq_enable,
            REG_SS_COLLISION => self.sprite_sprite_collision,
            REG_SB_COLLISION => self.sprite_bg_collision,
            r if r <= 0x2E => self.regs[r],
            _ => 0xFF,
        }
    }

    /// Write a VIC register.
    pub fn write(&mut self, reg: u8, value: u8) {
        let r = (reg & 0x3F) as usize;
        match r {
            REG_CTRL1 => {
                // Bit 7 is the raster-compare MSB, not a control bit.
                self.regs[r] = (value & 0x7F) | (self.regs[r] & 0x80);
                self.raster_compare =
                    (self.raster_compare & 0x00FF) | (u16::from(value & 0x80) << 1);
                if value & 0x40 != 0 {
                    warn!("VIC $D011 write ${value:02X}: extended colour mode not implemented");
                }
            }
            REG_RASTER => {
                self.raster_compare = (self.raster_compare & 0x0100) | u16::from(value);
            }
            REG_CTRL2 => {
                self.regs[r] = value;
                if value & 0x10 != 0 && self.regs[REG_CTRL1] & 0x20 == 0 {
                    warn!("VIC $D016 write ${value:02X}: multicolour text mode not implemented");
                }
            }
            REG_IRQ_STATUS => {
                // Writing 1 bits acknowledges those interrupts.
                self.irq_status &= !(value & 0x0F);
            }
            REG_IRQ_ENABLE => {
                self.irq_enable = value & 0x0F;
            }
            REG_SS_COLLISION | REG_SB_COLLISION => {
                // Collision latches are read-only.
            }
            _ if r <= 0x2E => self.regs[r] = value,
            _ => {
                warn!("VIC write to unmapped register offset ${r:02X} = ${value:02X}");
            }
        }
    }

    /// Is an enabled interrupt condition pending?
    #[must_use]
    pub fn irq_active(&self) -> bool {
        (self.irq_status & self.irq_enable & 0x0F) != 0
    }

    /// Set the video bank (0-3) from CIA2 port A.
    pub fn set_bank(&mut self, bank: u8) {
        self.video_bank = bank & 0x03;
    }

    /// Current video bank.
    #[must_use]
    pub fn bank(&self) -> u8 {
        self.video_bank
    }

    /// The RGB frame buffer, 3 bytes per pixel, row-major.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Frame buffer width in pixels.
    #[must_use]
    pub const fn framebuffer_width(&self) -> u32 {
        FB_WIDTH as u32
    }

    /// Frame buffer height in pixels.
    #[must_use]
    pub const fn framebuffer_height(&self) -> u32 {
        FB_HEIGHT as u32
    }

    /// Last completed raster line.
    #[must_use]
    pub fn raster_line(&self) -> u16 {
        self.last_raster_line
    }

    /// Check and clear the frame-complete flag.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }
}

impl Default for Vic {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_memory(char_fill: u8) -> C64Memory {
        C64Memory::new(&vec![0; 8192], &vec![0; 8192], &vec![char_fill; 4096]).unwrap()
    }

    /// Drive the raster line by line up to and including `target`, so
    /// every line before it has been rasterized.
    fn run_lines(vic: &mut Vic, memory: &C64Memory, target: u16) {
        for line in 1..=u64::from(target) {
            vic.refresh(line * CYCLES_PER_RASTERLINE, memory);
        }
    }

    fn pixel(vic: &Vic, x: usize, y: usize) -> (u8, u8, u8) {
        let idx = (y * FB_WIDTH + x) * 3;
        let fb = vic.framebuffer();
        (fb[idx], fb[idx + 1], fb[idx + 2])
    }

    #[test]
    fn geometry_constants() {
        assert_eq!(FB_WIDTH, 405);
        assert_eq!(FB_HEIGHT, 284);
        assert_eq!(CYCLES_PER_FRAME, 19_656);
    }

    #[test]
    fn raster_latch_follows_cycle_counter() {
        let mut vic = Vic::new();
        let memory = make_memory(0);

        for cycles in [63u64, 630, 63 * 255, 63 * 256, 63 * 311] {
            vic.refresh(cycles, &memory);
            let line = ((cycles % CYCLES_PER_FRAME) / CYCLES_PER_RASTERLINE) as u16;
            let latched = u16::from(vic.peek(0x12))
                | (u16::from(vic.peek(0x11) & 0x80) << 1);
            assert_eq!(latched, line, "latched raster at cycle {cycles}");
        }
    }

    #[test]
    fn frame_complete_on_wrap() {
        let mut vic = Vic::new();
        let memory = make_memory(0);

        run_lines(&mut vic, &memory, 311);
        assert!(!vic.take_frame_complete());
        vic.refresh(CYCLES_PER_FRAME, &memory); // wraps to line 0
        assert!(vic.take_frame_complete());
        assert!(!vic.take_frame_complete(), "cleared after take");
    }

    #[test]
    fn display_disabled_paints_border_everywhere() {
        let mut vic = Vic::new();
        let memory = make_memory(0xFF);
        vic.write(0x20, 0x0E); // light blue border
        vic.write(0x21, 0x06); // blue background
        // DEN stays 0

        run_lines(&mut vic, &memory, 311);
        vic.refresh(CYCLES_PER_FRAME, &memory);

        let light_blue = PALETTE[0x0E];
        // Sample border and display-region pixels alike
        assert_eq!(pixel(&vic, 0, 0), light_blue);
        assert_eq!(pixel(&vic, 200, 140), light_blue, "display region is border with DEN=0");
        assert_eq!(pixel(&vic, FB_WIDTH - 1, FB_HEIGHT - 1), light_blue);
    }

    #[test]
    fn raster_compare_irq() {
        let mut vic = Vic::new();
        let memory = make_memory(0);
        vic.write(0x12, 100); // compare line 100
        vic.write(0x1A, 0x01); // enable raster IRQ

        run_lines(&mut vic, &memory, 99);
        assert!(!vic.irq_active());
        vic.refresh(100 * CYCLES_PER_RASTERLINE, &memory);
        assert!(vic.irq_active());

        // Acknowledge
        vic.write(0x19, 0x01);
        assert!(!vic.irq_active());
    }

    #[test]
    fn text_mode_cell_pattern() {
        let mut vic = Vic::new();
        let mut chargen = vec![0u8; 4096];
        chargen[8] = 0b1011_0001; // code 1, row 0
        let mut memory = C64Memory::new(&vec![0; 8192], &vec![0; 8192], &chargen).unwrap();
        // Screen at $0400, char slot 2 (ROM); code 1 at cell (0,0)
        memory.ram_write(0x0400, 0x01);
        memory.colour_ram_write(0, 0x01); // white foreground
        vic.write(0x11, 0x1B); // DEN + RSEL
        vic.write(0x16, 0x08); // CSEL, no scroll
        vic.write(0x18, 0x14); // screen $0400, chars $1000 (ROM)
        vic.write(0x21, 0x06); // blue background

        // Rasterize display line 51 (cell row 0, char row 0)
        run_lines(&mut vic, &memory, 52);

        let fb_y = (51 - BORDER_TOP) as usize;
        let fb_x0 = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let white = PALETTE[1];
        let blue = PALETTE[6];
        let expected = [
            white, blue, white, white, blue, blue, blue, white,
        ];
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(
                pixel(&vic, fb_x0 + i, fb_y),
                *want,
                "pixel {i} of pattern 10110001"
            );
        }
    }

    #[test]
    fn hires_bitmap_nibble_split() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);
        // Screen byte $AB at cell (0,0): hi nibble $A set-colour, lo $B clear
        memory.ram_write(0x0400, 0xAB);
        // Bitmap byte $F0 at bitmap base $2000, cell (0,0), row 0
        memory.ram_write(0x2000, 0xF0);

        vic.write(0x11, 0x3B); // DEN + RSEL + bitmap
        vic.write(0x16, 0x08);
        vic.write(0x18, 0x18); // screen $0400, bitmap $2000

        run_lines(&mut vic, &memory, 52);

        let fb_y = (51 - BORDER_TOP) as usize;
        let fb_x0 = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        for i in 0..4 {
            assert_eq!(pixel(&vic, fb_x0 + i, fb_y), PALETTE[0x0A], "left nibble");
        }
        for i in 4..8 {
            assert_eq!(pixel(&vic, fb_x0 + i, fb_y), PALETTE[0x0B], "right nibble");
        }
    }

    #[test]
    fn multicolour_bitmap_pairs() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);
        memory.ram_write(0x0400, 0x25); // hi nibble 2 (01), lo nibble 5 (10)
        memory.colour_ram_write(0, 0x07); // 11 → yellow
        memory.ram_write(0x2000, 0b00_01_10_11);

        vic.write(0x11, 0x3B); // DEN + bitmap
        vic.write(0x16, 0x18); // CSEL + multicolour
        vic.write(0x18, 0x18);
        vic.write(0x21, 0x06); // 00 → blue

        run_lines(&mut vic, &memory, 52);

        let fb_y = (51 - BORDER_TOP) as usize;
        let fb_x0 = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let expect = [
            PALETTE[6], PALETTE[6], // 00 background
            PALETTE[2], PALETTE[2], // 01 screen high nibble
            PALETTE[5], PALETTE[5], // 10 screen low nibble
            PALETTE[7], PALETTE[7], // 11 colour RAM
        ];
        for (i, want) in expect.iter().enumerate() {
            assert_eq!(pixel(&vic, fb_x0 + i, fb_y), *want, "pair pixel {i}");
        }
    }

    #[test]
    fn sprite_block_at_window_origin() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);

        // Sprite 0 at X=24, Y=50 → display window (0,0). All-ones data.
        vic.write(0x15, 0x01);
        vic.write(0x00, 24);
        vic.write(0x01, 50);
        vic.write(0x27, 0x01); // white
        vic.write(0x11, 0x1B);
        vic.write(0x16, 0x08);
        vic.write(0x18, 0x14);
        vic.write(0x21, 0x06);

        memory.ram_write(0x07F8, 0x80); // pointer → $2000
        for i in 0..63 {
            memory.ram_write(0x2000 + i, 0xFF);
        }

        run_lines(&mut vic, &memory, 100);

        let white = PALETTE[1];
        let blue = PALETTE[6];
        let origin_x = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let origin_y = (DISPLAY_TOP - BORDER_TOP) as usize;

        // 24x21 block painted from the window origin
        assert_eq!(pixel(&vic, origin_x, origin_y), white);
        assert_eq!(pixel(&vic, origin_x + 23, origin_y + 20), white);
        // ... and not elsewhere
        assert_eq!(pixel(&vic, origin_x + 24, origin_y), blue);
        assert_eq!(pixel(&vic, origin_x, origin_y + 21), blue);
    }

    #[test]
    fn sprite_zero_is_topmost() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);

        // Sprites 0 and 1 fully overlapping
        vic.write(0x15, 0x03);
        vic.write(0x00, 100);
        vic.write(0x01, 100);
        vic.write(0x02, 100);
        vic.write(0x03, 100);
        vic.write(0x27, 0x01); // sprite 0 white
        vic.write(0x28, 0x02); // sprite 1 red
        vic.write(0x11, 0x1B);
        vic.write(0x16, 0x08);
        vic.write(0x18, 0x14);

        memory.ram_write(0x07F8, 0x80);
        memory.ram_write(0x07F9, 0x80);
        for i in 0..63 {
            memory.ram_write(0x2000 + i, 0xFF);
        }

        run_lines(&mut vic, &memory, 160);

        let wx = (100 - 24) + (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let wy = (100 - 50) + (DISPLAY_TOP - BORDER_TOP) as usize;
        assert_eq!(pixel(&vic, wx, wy), PALETTE[1], "sprite 0 wins the overlap");

        // Both latched in the sprite-sprite collision register
        assert_eq!(vic.read(0x1E) & 0x03, 0x03);
        assert_eq!(vic.read(0x1E), 0x00, "clear on read");
    }

    #[test]
    fn multicolour_sprite_decode() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);

        vic.write(0x15, 0x01);
        vic.write(0x1C, 0x01); // sprite 0 multicolour
        vic.write(0x00, 24);
        vic.write(0x01, 50);
        vic.write(0x25, 0x02); // 01 → red
        vic.write(0x27, 0x05); // 10 → green
        vic.write(0x26, 0x07); // 11 → yellow
        vic.write(0x11, 0x1B);
        vic.write(0x16, 0x08);
        vic.write(0x18, 0x14);
        vic.write(0x21, 0x06);

        memory.ram_write(0x07F8, 0x80);
        memory.ram_write(0x2000, 0b01_10_11_00);

        run_lines(&mut vic, &memory, 52);

        let x0 = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let y0 = (DISPLAY_TOP - BORDER_TOP) as usize;
        assert_eq!(pixel(&vic, x0, y0), PALETTE[2], "pair 01 = $D025");
        assert_eq!(pixel(&vic, x0 + 2, y0), PALETTE[5], "pair 10 = sprite colour");
        assert_eq!(pixel(&vic, x0 + 4, y0), PALETTE[7], "pair 11 = $D026");
        assert_eq!(pixel(&vic, x0 + 6, y0), PALETTE[6], "pair 00 transparent");
    }

    #[test]
    fn sprite_background_collision_latches() {
        let mut vic = Vic::new();
        let chargen = vec![0xFF; 4096]; // every text pixel foreground
        let mut memory =
            C64Memory::new(&vec![0; 8192], &vec![0; 8192], &chargen).unwrap();
        memory.colour_ram_write(0, 0x01);

        vic.write(0x15, 0x01);
        vic.write(0x00, 24);
        vic.write(0x01, 50);
        vic.write(0x27, 0x01);
        vic.write(0x11, 0x1B);
        vic.write(0x16, 0x08);
        vic.write(0x18, 0x14);

        memory.ram_write(0x07F8, 0x80);
        memory.ram_write(0x2000, 0xFF);

        run_lines(&mut vic, &memory, 52);

        assert_ne!(vic.read(0x1F) & 0x01, 0, "sprite 0 collided with foreground");
        assert_eq!(vic.read(0x1F), 0, "clear on read");
    }

    #[test]
    fn register_mirroring() {
        let mut vic = Vic::new();
        vic.write(0x20, 0x0E);
        // $D060 mirrors $D020 through the 6-bit mask
        assert_eq!(vic.read(0x60), 0x0E);
        // Offsets past the file read open-bus
        assert_eq!(vic.read(0x3F), 0xFF);
    }

    #[test]
    fn bank_selection_masks() {
        let mut vic = Vic::new();
        vic.set_bank(2);
        assert_eq!(vic.bank(), 2);
        vic.set_bank(5);
        assert_eq!(vic.bank(), 1);
    }

    #[test]
    fn horizontal_scroll_shifts_output() {
        let mut vic = Vic::new();
        let mut memory = make_memory(0);
        memory.ram_write(0x0400, 0xAB);
        memory.ram_write(0x2000, 0xFF); // all pixels set → colour $A

        vic.write(0x11, 0x3B);
        vic.write(0x16, 0x08 | 0x03); // CSEL + xscroll 3
        vic.write(0x18, 0x18);
        vic.write(0x20, 0x0E);

        run_lines(&mut vic, &memory, 52);

        let fb_y = (51 - BORDER_TOP) as usize;
        let fb_x0 = (DISPLAY_LEFT - BORDER_LEFT) as usize;
        let light_blue = PALETTE[0x0E];

        // The leading columns no source column maps to show the border
        for x in 0..3 {
            assert_eq!(pixel(&vic, x, fb_y), light_blue, "leading column {x}");
        }
        // The left border shifts with the display
        for x in fb_x0..fb_x0 + 3 {
            assert_eq!(pixel(&vic, x, fb_y), light_blue, "shifted border at {x}");
        }
        assert_eq!(
            pixel(&vic, fb_x0 + 3, fb_y),
            PALETTE[0x0A],
            "first display pixel lands 3 to the right"
        );

        // Right edge: the last display column keeps its shifted position
        // and the following border column does not clobber it. Cell 39
        // has a zero bitmap byte, so its pixels take the screen byte's
        // low nibble (zero → black).
        let last_display = (DISPLAY_RIGHT - BORDER_LEFT) as usize + 3;
        assert_eq!(pixel(&vic, last_display, fb_y), PALETTE[0x00]);
        assert_eq!(pixel(&vic, last_display + 1, fb_y), light_blue);
        // The final framebuffer column is still covered this pass
        assert_eq!(pixel(&vic, FB_WIDTH - 1, fb_y), light_blue);
    }
}

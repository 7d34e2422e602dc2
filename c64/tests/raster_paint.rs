//! Full-frame rendering tests through the whole machine.

use emu64_core::Bus as _;
use emu64_c64::vic::{FB_HEIGHT, FB_WIDTH};
use emu64_c64::{palette::PALETTE, C64, C64Config};

/// Kernal that resets into an endless NOP sled at $E000.
fn nop_kernal() -> Vec<u8> {
    let mut kernal = vec![0xEA; 8192];
    kernal[0x1FFC] = 0x00;
    kernal[0x1FFD] = 0xE0;
    kernal
}

fn make_c64() -> C64 {
    let config = C64Config {
        kernal_rom: nop_kernal(),
        basic_rom: vec![0; 8192],
        char_rom: vec![0; 4096], // blank glyphs; space renders background
    };
    C64::new(&config).expect("machine should build")
}

fn pixel(c64: &C64, x: usize, y: usize) -> (u8, u8, u8) {
    let fb = c64.framebuffer();
    let idx = (y * FB_WIDTH + x) * 3;
    (fb[idx], fb[idx + 1], fb[idx + 2])
}

#[test]
fn uniform_text_screen_paints_display_and_border() {
    let mut c64 = make_c64();

    // Screen full of spaces, colour RAM white, blue background,
    // light blue border, display enabled.
    for i in 0..1000u16 {
        c64.bus_mut().memory.ram_write(0x0400 + i, 0x20);
        c64.bus_mut().memory.colour_ram_write(i, 0x01);
    }
    c64.bus_mut().write(0xD018, 0x14); // screen $0400, chars $1000
    c64.bus_mut().write(0xD021, 0x06); // background blue
    c64.bus_mut().write(0xD020, 0x0E); // border light blue
    c64.bus_mut().write(0xD011, 0x1B); // DEN + 25 rows
    c64.bus_mut().write(0xD016, 0x08); // 40 columns

    c64.run_frame().expect("frame should run");
    c64.run_frame().expect("second frame repaints every line");

    let blue = PALETTE[0x06];
    let light_blue = PALETTE[0x0E];

    // Display region: raster lines 51-250, columns 124-443 map to
    // frame-buffer (48..368, 35..235).
    let mut blue_pixels = 0usize;
    let mut border_pixels = 0usize;
    for y in 0..FB_HEIGHT {
        for x in 0..FB_WIDTH {
            let p = pixel(&c64, x, y);
            let in_display = (48..368).contains(&x) && (35..235).contains(&y);
            if in_display {
                assert_eq!(p, blue, "display pixel at ({x},{y})");
                blue_pixels += 1;
            } else {
                assert_eq!(p, light_blue, "border pixel at ({x},{y})");
                border_pixels += 1;
            }
        }
    }
    assert_eq!(blue_pixels, 320 * 200);
    assert_eq!(border_pixels, FB_WIDTH * FB_HEIGHT - 320 * 200);
}

#[test]
fn border_colour_change_applies_next_frame() {
    let mut c64 = make_c64();
    c64.bus_mut().write(0xD020, 0x02); // red border

    c64.run_frame().expect("frame should run");
    assert_eq!(pixel(&c64, 0, 0), PALETTE[0x02]);

    c64.bus_mut().write(0xD020, 0x05); // green
    c64.run_frame().expect("frame should run");
    assert_eq!(pixel(&c64, 0, 0), PALETTE[0x05]);
}

#[test]
fn display_disabled_is_all_border() {
    let mut c64 = make_c64();
    c64.bus_mut().write(0xD020, 0x0E);
    c64.bus_mut().write(0xD021, 0x06);
    // DEN stays 0

    c64.run_frame().expect("frame should run");

    let light_blue = PALETTE[0x0E];
    assert_eq!(pixel(&c64, 200, 140), light_blue, "display centre is border");
    assert_eq!(pixel(&c64, 0, 0), light_blue);
}

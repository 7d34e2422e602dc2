//! C64 colour palette.
//!
//! 16 colours as RGB triples, using the VICE PAL palette values, in the
//! documented VIC-II order.

/// C64 palette: 16 colours indexed 0-15.
pub const PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00), // 0: Black
    (0xFF, 0xFF, 0xFF), // 1: White
    (0x88, 0x39, 0x32), // 2: Red
    (0x67, 0xB6, 0xBD), // 3: Cyan
    (0x8B, 0x3F, 0x96), // 4: Purple
    (0x55, 0xA0, 0x49), // 5: Green
    (0x40, 0x31, 0x8D), // 6: Blue
    (0xBF, 0xCE, 0x72), // 7: Yellow
    (0x8B, 0x54, 0x29), // 8: Orange
    (0x57, 0x42, 0x00), // 9: Brown
    (0xB8, 0x69, 0x62), // 10: Pink
    (0x50, 0x50, 0x50), // 11: Dark Grey
    (0x78, 0x78, 0x78), // 12: Grey
    (0x94, 0xE0, 0x89), // 13: Light Green
    (0x78, 0x68, 0xC0), // 14: Light Blue
    (0x9F, 0x9F, 0x9F), // 15: Light Grey
];

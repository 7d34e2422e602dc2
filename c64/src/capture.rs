//! Headless capture: PNG screenshots of the frame buffer.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use crate::C64;

/// Save the current frame buffer as a PNG file.
///
/// The frame buffer is already 3-byte RGB, which the encoder takes
/// directly.
///
/// # Errors
///
/// I/O or encoding failures from the `png` crate.
pub fn save_screenshot(c64: &C64, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, c64.framebuffer_width(), c64.framebuffer_height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(c64.framebuffer())?;
    Ok(())
}

//! PNG dumps of render buffers.

use std::path::Path;

use vibe_render_core::Buffer;

use crate::machine::MachineError;

/// Expands a buffer to 8-bit RGB. Indexed pixels become gray levels of their
/// low byte; direct-color pixels are split from 0x00RRGGBB.
pub fn buffer_to_rgb(buffer: &Buffer) -> Vec<u8> {
    match buffer {
        Buffer::Indexed(b) => b
            .pixels()
            .iter()
            .flat_map(|&px| {
                let level = (px & 0xFF) as u8;
                [level, level, level]
            })
            .collect(),
        Buffer::Rgb(b) => b
            .pixels()
            .iter()
            .flat_map(|&px| [(px >> 16) as u8, (px >> 8) as u8, px as u8])
            .collect(),
    }
}

pub fn write_png(path: &Path, buffer: &Buffer) -> Result<(), MachineError> {
    let io_err = |source| MachineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let png_err = |source| MachineError::Png {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, buffer.width(), buffer.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(png_err)?;
    writer
        .write_image_data(&buffer_to_rgb(buffer))
        .map_err(png_err)?;
    writer.finish().map_err(png_err)
}

use std::fs::File;
use std::io::BufReader;

use vibe_render::snapshot::{buffer_to_rgb, write_png};
use vibe_render_core::{Buffer, PixelKind};

#[test]
fn indexed_buffers_become_gray() {
    let mut buffer = Buffer::empty(PixelKind::Indexed);
    buffer.resize_and_fill(2, 1, 0x1234);
    assert_eq!(buffer_to_rgb(&buffer), [0x34, 0x34, 0x34, 0x34, 0x34, 0x34]);
}

#[test]
fn png_round_trips_rgb_pixels() {
    let mut buffer = Buffer::empty(PixelKind::Rgb);
    buffer.resize_and_fill(3, 2, 0x00AB_CDEF);
    if let Buffer::Rgb(b) = &mut buffer {
        *b.pixel_mut(2, 1) = 0x0010_2030;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames").join("out.png");
    write_png(&path, &buffer).unwrap();

    let decoder = png::Decoder::new(BufReader::new(File::open(&path).unwrap()));
    let mut reader = decoder.read_info().unwrap();
    let mut data = vec![0; reader.output_buffer_size().unwrap()];
    let info = reader.next_frame(&mut data).unwrap();
    assert_eq!((info.width, info.height), (3, 2));
    assert_eq!(info.color_type, png::ColorType::Rgb);
    assert_eq!(&data[..3], &[0xAB, 0xCD, 0xEF]);
    assert_eq!(&data[15..18], &[0x10, 0x20, 0x30]);
}

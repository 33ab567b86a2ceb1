#![no_main]

use arbitrary::Arbitrary;
use image_splice::engine::rewrite_dimensions;
use image_splice::{ChecksumMode, ContainerFormat};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    format_byte: u8,
    width: u32,
    height: u32,
    recompute: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let format = match input.format_byte % 3 {
        0 => ContainerFormat::Png,
        1 => ContainerFormat::Jpeg,
        _ => ContainerFormat::Gif,
    };
    let checksums = if input.recompute {
        ChecksumMode::Recompute
    } else {
        ChecksumMode::Stale
    };

    let mut data = input.data;
    let len = data.len();
    // must never panic on arbitrary buffers and never change the length
    let _ = rewrite_dimensions(&mut data, format, input.width, input.height, checksums);
    assert_eq!(data.len(), len);
});

#![no_main]

use arbitrary::Arbitrary;
use image_splice::{inject_at_zone, ContainerFormat, InjectionZone};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    format_byte: u8,
    zone_byte: u8,
    payload: Vec<u8>,
    image: Vec<u8>,
}

fn format_from_byte(b: u8) -> ContainerFormat {
    match b % 4 {
        0 => ContainerFormat::Png,
        1 => ContainerFormat::Jpeg,
        2 => ContainerFormat::Gif,
        _ => ContainerFormat::Generic,
    }
}

fuzz_target!(|input: Input| {
    let format = format_from_byte(input.format_byte);
    let zone = InjectionZone::ALL[input.zone_byte as usize % 3];

    match inject_at_zone(&input.image, format, zone, &input.payload) {
        Ok(out) => {
            assert_eq!(out.len(), input.image.len() + input.payload.len());
        }
        Err(_) => {
            // only a header zone on a short buffer may fail
            assert_eq!(zone, InjectionZone::Header);
            assert!(input.image.len() < format.header_offset());
        }
    }
});

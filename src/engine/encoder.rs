// src/engine/encoder.rs
//
// Image-encoding collaborator: materializes a solid raster canvas and
// serializes it to PNG, JPEG or GIF. Large canvases may fail; callers treat
// that as a recoverable per-attempt failure.

use crate::engine::common::run_with_panic_policy;
use crate::error::{Result, SpliceError};
use crate::ops::ContainerFormat;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Something that can produce an encoded solid-color canvas.
///
/// The synthesizer only ever talks to this trait, so tests can simulate
/// allocation failure at chosen sizes.
pub trait CanvasEncoder: Send + Sync {
    fn encode_canvas(
        &self,
        width: u32,
        height: u32,
        color: [u8; 3],
        format: ContainerFormat,
    ) -> Result<Vec<u8>>;
}

/// Default encoder backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateEncoder;

impl CanvasEncoder for ImageCrateEncoder {
    fn encode_canvas(
        &self,
        width: u32,
        height: u32,
        color: [u8; 3],
        format: ContainerFormat,
    ) -> Result<Vec<u8>> {
        run_with_panic_policy("encode:canvas", || {
            let canvas = allocate_canvas(width, height, color)?;
            encode_rgb(&canvas, format)
        })
    }
}

/// Allocate a solid RGB canvas without aborting the process on OOM.
pub fn allocate_canvas(width: u32, height: u32, color: [u8; 3]) -> Result<RgbImage> {
    let bytes = (width as u64).saturating_mul(height as u64).saturating_mul(3);
    let len =
        usize::try_from(bytes).map_err(|_| SpliceError::allocation_failed(width, height, bytes))?;

    let mut raw = Vec::new();
    raw.try_reserve_exact(len)
        .map_err(|_| SpliceError::allocation_failed(width, height, bytes))?;
    raw.resize(len, 0);
    for px in raw.chunks_exact_mut(3) {
        px.copy_from_slice(&color);
    }

    RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| SpliceError::allocation_failed(width, height, bytes))
}

/// Encode an RGB image. `Generic` targets are written as PNG.
pub fn encode_rgb(img: &RgbImage, format: ContainerFormat) -> Result<Vec<u8>> {
    let image_format = match format {
        ContainerFormat::Png | ContainerFormat::Generic => ImageFormat::Png,
        ContainerFormat::Jpeg => ImageFormat::Jpeg,
        ContainerFormat::Gif => ImageFormat::Gif,
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image_format)
        .map_err(|e| {
            SpliceError::encode_failed(format.as_str(), format!("{image_format:?} encode failed: {e}"))
        })?;
    Ok(buf)
}

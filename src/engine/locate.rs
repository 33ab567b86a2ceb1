// src/engine/locate.rs
//
// Insertion point resolution.
//
// These are deliberately non-parsing heuristics: a fixed offset per format for
// the header zone, a tag/marker search for the body zone, end-of-file for the
// trailer zone. They trade structural correctness for speed and coverage, so
// some injections will break file validity. That is intended.

use crate::error::{Result, SpliceError};
use crate::ops::{ContainerFormat, InjectionZone};

/// PNG chunk type tag of the first image data chunk.
pub const PNG_IDAT: &[u8; 4] = b"IDAT";

/// JPEG Start-Of-Scan marker.
pub const JPEG_SOS: [u8; 2] = [0xFF, 0xDA];

/// Half-width of the window searched around the midpoint of a JPEG.
pub const JPEG_BODY_WINDOW: usize = 2000;

/// Resolve the byte offset at which a payload is spliced.
///
/// The result is always within `[0, bytes.len()]`. Only the header zone can
/// fail: when the buffer is shorter than the format's fixed header offset the
/// resolver reports `TooShort` instead of guessing.
pub fn resolve(bytes: &[u8], format: ContainerFormat, zone: InjectionZone) -> Result<usize> {
    let offset = match zone {
        InjectionZone::Header => header_offset(bytes, format)?,
        InjectionZone::Body => body_offset(bytes, format),
        InjectionZone::Trailer => bytes.len(),
    };
    Ok(offset.min(bytes.len()))
}

fn header_offset(bytes: &[u8], format: ContainerFormat) -> Result<usize> {
    let required = format.header_offset();
    if bytes.len() < required {
        return Err(SpliceError::too_short(format.as_str(), required, bytes.len()));
    }
    Ok(required)
}

fn body_offset(bytes: &[u8], format: ContainerFormat) -> usize {
    let mid = bytes.len() / 2;
    match format {
        ContainerFormat::Png => png_first_data_chunk(bytes).unwrap_or(mid),
        ContainerFormat::Jpeg => jpeg_marker_near(bytes, mid).unwrap_or(mid),
        ContainerFormat::Gif | ContainerFormat::Generic => mid,
    }
}

/// Offset of the length field of the first `IDAT` chunk, searching from
/// just past the signature.
pub(crate) fn png_first_data_chunk(bytes: &[u8]) -> Option<usize> {
    let start = ContainerFormat::Png.header_offset();
    let tail = bytes.get(start..)?;
    find(tail, PNG_IDAT).map(|p| start + p - 4)
}

/// Two bytes past a SOS marker inside the midpoint window, else two bytes past
/// any 0xFF in that window.
///
/// With no marker in the window the caller falls back to the raw midpoint,
/// which may land inside scan data. That is accepted best-effort corruption.
fn jpeg_marker_near(bytes: &[u8], mid: usize) -> Option<usize> {
    let lo = mid.saturating_sub(JPEG_BODY_WINDOW);
    let hi = mid.saturating_add(JPEG_BODY_WINDOW).min(bytes.len());
    let window = &bytes[lo..hi];

    find(window, &JPEG_SOS)
        .or_else(|| window.iter().position(|&b| b == 0xFF))
        .map(|m| lo + m + 2)
}

/// First occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

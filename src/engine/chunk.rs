// src/engine/chunk.rs
//
// Byte-level structure helpers for forging and locating PNG chunks and JPEG
// segments. Walkers here are only used on skeletons we encoded ourselves;
// caller-supplied images go through the non-parsing heuristics in locate.rs.

use crate::error::{Result, SpliceError};
use crate::ops::ContainerFormat;
use flate2::Crc;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Length (4) + type (4) in front of chunk data.
pub const PNG_CHUNK_HEADER_LEN: usize = 8;

/// CRC written into forged chunks when checksums are left stale.
pub const PLACEHOLDER_CRC: u32 = 0x1234_5678;

/// CRC-32 over a chunk's type and data, as PNG defines it.
pub fn png_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    crc.sum()
}

/// Serialize a chunk whose length field says `declared_len` regardless of how
/// much data is actually written.
pub fn forged_png_chunk(kind: &[u8; 4], declared_len: u32, data: &[u8], crc: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(PNG_CHUNK_HEADER_LEN + data.len() + 4);
    out.extend_from_slice(&declared_len.to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Offset of the first chunk of type `kind`, walking real chunk lengths.
pub fn find_png_chunk(bytes: &[u8], kind: &[u8; 4]) -> Option<usize> {
    let mut pos = PNG_SIGNATURE.len();
    while pos.checked_add(PNG_CHUNK_HEADER_LEN)? <= bytes.len() {
        let len = read_u32_be(bytes, pos)? as usize;
        if &bytes[pos + 4..pos + 8] == kind {
            return Some(pos);
        }
        pos = pos
            .checked_add(PNG_CHUNK_HEADER_LEN)?
            .checked_add(len)?
            .checked_add(4)?;
    }
    None
}

/// Recompute the CRC of the chunk at `chunk_offset` over `data_len` bytes of
/// data, writing it right after that data.
///
/// `data_len` is explicit because forged chunks declare a length that does not
/// match what was written. Use [`recompute_declared_crc`] for honest chunks.
pub fn recompute_crc(bytes: &mut [u8], chunk_offset: usize, data_len: usize) -> Result<()> {
    let data_start = chunk_offset + PNG_CHUNK_HEADER_LEN;
    let crc_start = data_start.saturating_add(data_len);
    if crc_start.saturating_add(4) > bytes.len() {
        return Err(SpliceError::too_short(
            ContainerFormat::Png.as_str(),
            crc_start.saturating_add(4),
            bytes.len(),
        ));
    }
    let mut kind = [0u8; 4];
    kind.copy_from_slice(&bytes[chunk_offset + 4..data_start]);
    let crc = png_crc(&kind, &bytes[data_start..crc_start]);
    bytes[crc_start..crc_start + 4].copy_from_slice(&crc.to_be_bytes());
    Ok(())
}

/// Recompute the CRC of the chunk at `chunk_offset` using its length field.
pub fn recompute_declared_crc(bytes: &mut [u8], chunk_offset: usize) -> Result<()> {
    let declared = read_u32_be(bytes, chunk_offset).ok_or_else(|| {
        SpliceError::too_short(ContainerFormat::Png.as_str(), chunk_offset + 4, bytes.len())
    })?;
    recompute_crc(bytes, chunk_offset, declared as usize)
}

/// Offset of the first SOFn marker (frame header) in a JPEG.
///
/// Stops at SOS/EOI: a frame header after the first scan is not one we forge.
pub fn find_jpeg_frame_header(bytes: &[u8]) -> Option<usize> {
    let mut pos = ContainerFormat::Jpeg.header_offset();
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        match marker {
            // fill byte before the real marker
            0xFF => {
                pos += 1;
                continue;
            }
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => return Some(pos),
            _ => {}
        }
        let seg_len = read_u16_be(bytes, pos + 2)? as usize;
        pos = pos.checked_add(2)?.checked_add(seg_len)?;
    }
}

pub(crate) fn read_u32_be(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

pub(crate) fn read_u16_be(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([raw[0], raw[1]]))
}

#[cfg(test)]
pub(crate) fn read_u16_le(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

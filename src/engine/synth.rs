// src/engine/synth.rs
//
// Malformed artifact synthesis: pixel floods, oversized metadata,
// decompression bombs and forged color-profile chunks.
//
// Every builder starts from a skeleton produced by the CanvasEncoder and then
// tampers with it at the byte level. CRC fields covering rewritten or forged
// PNG chunks are left stale unless ChecksumMode::Recompute is configured;
// target decoders are assumed lenient.

use crate::engine::chunk::{
    find_jpeg_frame_header, find_png_chunk, forged_png_chunk, png_crc, recompute_declared_crc,
    PLACEHOLDER_CRC,
};
use crate::engine::common::run_with_panic_policy;
use crate::engine::encoder::CanvasEncoder;
use crate::engine::inject::inject;
use crate::engine::locate::resolve;
use crate::error::{Result, SpliceError};
use crate::ops::{ChecksumMode, ContainerFormat, InjectionZone, SynthesisKind};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::Bytes;
use parking_lot::{const_mutex, Mutex};
use tracing::{debug, info, warn};

/// JPEG comment marker (second byte of 0xFFFE).
pub const JPEG_COM: u8 = 0xFE;

/// Largest comment body whose length field (body + 2) still fits in u16.
pub const MAX_JPEG_COMMENT_LEN: usize = u16::MAX as usize - 2;

const MIB: u32 = 1024 * 1024;
const KIB: usize = 1024;
const WHITE: [u8; 3] = [255, 255, 255];

/// Builders may attempt very large allocations; only one runs at a time in
/// the whole process, whoever calls it.
static BUILDER_LOCK: Mutex<()> = const_mutex(());

/// Knobs for the four builders.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisConfig {
    /// Canvas sizes tried by PixelFlood, largest first.
    pub flood_rungs: Vec<(u32, u32)>,
    pub flood_color: [u8; 3],
    /// Skeleton size for LongBody and ColorProfileDoS.
    pub skeleton_dimensions: (u32, u32),
    /// Number of PNG tEXt entries the text budget is spread over.
    pub text_entries: usize,
    /// Total PNG text bytes across all entries.
    pub text_budget: usize,
    /// JPEG comment body length; the segment length field is this plus 2.
    pub comment_len: usize,
    pub bomb_skeleton: (u32, u32),
    /// Dimensions written over the skeleton's real ones.
    pub bomb_dimensions: (u32, u32),
    /// Length the forged iCCP chunk claims to have.
    pub profile_declared_len: u32,
    pub profile_name: String,
    /// Bytes of (not validly compressed) profile data actually written.
    pub profile_padding: usize,
    pub checksums: ChecksumMode,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            flood_rungs: vec![(10_000, 10_000), (5_000, 5_000), (2_000, 2_000)],
            flood_color: WHITE,
            skeleton_dimensions: (100, 100),
            text_entries: 100,
            text_budget: 100 * KIB,
            comment_len: MAX_JPEG_COMMENT_LEN,
            bomb_skeleton: (1, 1),
            bomb_dimensions: (30_000, 30_000),
            profile_declared_len: 100 * MIB,
            profile_name: "Profile".to_string(),
            profile_padding: 64,
            checksums: ChecksumMode::Stale,
        }
    }
}

impl SynthesisConfig {
    /// Smaller sizes for memory-constrained hosts.
    pub fn conservative() -> Self {
        Self {
            flood_rungs: vec![(10_000, 10_000), (5_000, 5_000)],
            text_budget: 100 * 100,
            comment_len: 10_000,
            bomb_dimensions: (10_000, 10_000),
            profile_declared_len: 100 * KIB as u32,
            ..Self::default()
        }
    }
}

/// A built artifact, ready to persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub kind: SynthesisKind,
    pub format: ContainerFormat,
    /// Dimensions the file declares (for a bomb, the forged ones).
    pub dimensions: (u32, u32),
    pub bytes: Vec<u8>,
}

/// Format an artifact is actually written in. Unknown targets become PNG.
pub fn target_format(format: ContainerFormat) -> ContainerFormat {
    match format {
        ContainerFormat::Generic => ContainerFormat::Png,
        other => other,
    }
}

/// Build one artifact under the process-wide builder lock.
pub fn build(
    kind: SynthesisKind,
    format: ContainerFormat,
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
) -> Result<Artifact> {
    let _guard = BUILDER_LOCK.lock();
    let format = target_format(format);
    debug!(target: "image_splice::synth", %kind, %format, "building artifact");

    let stage = match kind {
        SynthesisKind::PixelFlood => "synth:pixel_flood",
        SynthesisKind::LongBody => "synth:long_body",
        SynthesisKind::DecompressionBomb => "synth:decompression",
        SynthesisKind::ColorProfileDoS => "synth:color_profile",
    };
    run_with_panic_policy(stage, || match kind {
        SynthesisKind::PixelFlood => pixel_flood(encoder, config, format),
        SynthesisKind::LongBody => long_body(encoder, config, format),
        SynthesisKind::DecompressionBomb => decompression_bomb(encoder, config, format),
        SynthesisKind::ColorProfileDoS => color_profile_dos(encoder, config, format),
    })
}

/// Try each rung in order and keep the first canvas the encoder produces.
pub fn pixel_flood(
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
    format: ContainerFormat,
) -> Result<Artifact> {
    let mut last_error = None;
    for (attempt, &(width, height)) in config.flood_rungs.iter().enumerate() {
        match encoder.encode_canvas(width, height, config.flood_color, format) {
            Ok(bytes) => {
                info!(
                    target: "image_splice::synth",
                    width, height, attempt, size = bytes.len(), "pixel flood canvas built"
                );
                return Ok(Artifact {
                    kind: SynthesisKind::PixelFlood,
                    format,
                    dimensions: (width, height),
                    bytes,
                });
            }
            Err(err) => {
                warn!(
                    target: "image_splice::synth",
                    width, height, error = %err, "pixel flood rung failed, trying smaller"
                );
                last_error = Some(err);
            }
        }
    }
    Err(SpliceError::ladder_exhausted(
        config.flood_rungs.len(),
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no canvas sizes configured".to_string()),
    ))
}

/// Skeleton plus an oversized metadata section.
pub fn long_body(
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
    format: ContainerFormat,
) -> Result<Artifact> {
    let (w, h) = config.skeleton_dimensions;
    let bytes = match format {
        ContainerFormat::Png => {
            let skeleton = encoder.encode_canvas(w, h, WHITE, format)?;
            png_with_text_entries(skeleton, config.text_entries, config.text_budget)?
        }
        ContainerFormat::Jpeg => {
            let skeleton = encoder.encode_canvas(w, h, WHITE, format)?;
            jpeg_with_comment(skeleton, config.comment_len)?
        }
        other => {
            return Err(SpliceError::unsupported_target(
                SynthesisKind::LongBody.as_str(),
                other.as_str(),
            ))
        }
    };
    Ok(Artifact {
        kind: SynthesisKind::LongBody,
        format,
        dimensions: (w, h),
        bytes,
    })
}

/// Insert `entries` tEXt chunks right after IHDR, spreading `budget` text
/// bytes evenly (the first `budget % entries` entries get one extra byte).
fn png_with_text_entries(skeleton: Vec<u8>, entries: usize, budget: usize) -> Result<Vec<u8>> {
    if entries == 0 {
        return Err(SpliceError::invalid_argument(
            "text_entries",
            "0",
            "at least one text entry is needed",
        ));
    }
    let mut png = Png::from_bytes(Bytes::from(skeleton))
        .map_err(|e| SpliceError::encode_failed("png", format!("failed to parse skeleton: {e}")))?;

    let base = budget / entries;
    let extra = budget % entries;
    let chunks = (0..entries).map(|i| {
        let keyword = format!("Comment{i}");
        let text_len = base + usize::from(i < extra);
        let mut contents = Vec::with_capacity(keyword.len() + 1 + text_len);
        contents.extend_from_slice(keyword.as_bytes());
        contents.push(0);
        contents.resize(contents.len() + text_len, b'A');
        PngChunk::new(*b"tEXt", Bytes::from(contents))
    });

    let chunk_list = png.chunks_mut();
    let tail = chunk_list.split_off(chunk_list.len().min(1));
    chunk_list.extend(chunks);
    chunk_list.extend(tail);

    let mut output = Vec::new();
    png.encoder()
        .write_to(&mut output)
        .map_err(|e| SpliceError::encode_failed("png", format!("failed to write PNG: {e}")))?;
    Ok(output)
}

/// Insert one COM segment of `comment_len` bytes after the leading APPn
/// segments. The length field written is `comment_len + 2`.
fn jpeg_with_comment(skeleton: Vec<u8>, comment_len: usize) -> Result<Vec<u8>> {
    if comment_len > MAX_JPEG_COMMENT_LEN {
        return Err(SpliceError::invalid_argument(
            "comment_len",
            comment_len.to_string(),
            format!("a JPEG segment holds at most {MAX_JPEG_COMMENT_LEN} bytes"),
        ));
    }
    let mut jpeg = Jpeg::from_bytes(Bytes::from(skeleton)).map_err(|e| {
        SpliceError::encode_failed("jpeg", format!("failed to parse skeleton: {e}"))
    })?;

    let segment = JpegSegment::new_with_contents(JPEG_COM, Bytes::from(vec![b'A'; comment_len]));
    let segments = jpeg.segments_mut();
    let after_app = segments
        .iter()
        .take_while(|s| (0xE0..=0xEF).contains(&s.marker()))
        .count();
    segments.insert(after_app, segment);

    let mut output = Vec::new();
    jpeg.encoder()
        .write_to(&mut output)
        .map_err(|e| SpliceError::encode_failed("jpeg", format!("failed to write JPEG: {e}")))?;
    Ok(output)
}

/// Tiny skeleton whose dimension fields are overwritten with huge values.
pub fn decompression_bomb(
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
    format: ContainerFormat,
) -> Result<Artifact> {
    let (sw, sh) = config.bomb_skeleton;
    let (width, height) = config.bomb_dimensions;
    let mut bytes = encoder.encode_canvas(sw, sh, WHITE, format)?;
    rewrite_dimensions(&mut bytes, format, width, height, config.checksums)?;
    debug!(
        target: "image_splice::synth",
        width, height, size = bytes.len(), "declared dimensions rewritten"
    );
    Ok(Artifact {
        kind: SynthesisKind::DecompressionBomb,
        format,
        dimensions: (width, height),
        bytes,
    })
}

/// Overwrite the declared width/height in place.
///
/// - PNG: IHDR width/height, big-endian u32
/// - JPEG: SOFn height then width, big-endian u16
/// - GIF: logical screen width/height, little-endian u16
pub fn rewrite_dimensions(
    bytes: &mut [u8],
    format: ContainerFormat,
    width: u32,
    height: u32,
    checksums: ChecksumMode,
) -> Result<()> {
    match format {
        ContainerFormat::Png | ContainerFormat::Generic => {
            let ihdr = find_png_chunk(bytes, b"IHDR")
                .filter(|&at| at + 16 <= bytes.len())
                .ok_or_else(|| SpliceError::missing_structure("png", "IHDR chunk"))?;
            bytes[ihdr + 8..ihdr + 12].copy_from_slice(&width.to_be_bytes());
            bytes[ihdr + 12..ihdr + 16].copy_from_slice(&height.to_be_bytes());
            if checksums == ChecksumMode::Recompute {
                recompute_declared_crc(bytes, ihdr)?;
            }
        }
        ContainerFormat::Jpeg => {
            let (w, h) = (u16_dimension("width", width)?, u16_dimension("height", height)?);
            let sof = find_jpeg_frame_header(bytes)
                .filter(|&at| at + 9 <= bytes.len())
                .ok_or_else(|| SpliceError::missing_structure("jpeg", "frame header"))?;
            bytes[sof + 5..sof + 7].copy_from_slice(&h.to_be_bytes());
            bytes[sof + 7..sof + 9].copy_from_slice(&w.to_be_bytes());
        }
        ContainerFormat::Gif => {
            let (w, h) = (u16_dimension("width", width)?, u16_dimension("height", height)?);
            if bytes.len() < 10 {
                return Err(SpliceError::too_short("gif", 10, bytes.len()));
            }
            bytes[6..8].copy_from_slice(&w.to_le_bytes());
            bytes[8..10].copy_from_slice(&h.to_le_bytes());
        }
    }
    Ok(())
}

fn u16_dimension(name: &'static str, value: u32) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        SpliceError::invalid_argument(name, value.to_string(), "this format stores 16-bit dimensions")
    })
}

/// PNG skeleton with a forged iCCP chunk spliced in front of the first IDAT.
///
/// The chunk's length field claims `profile_declared_len` bytes while only the
/// profile name, a compression-method byte and `profile_padding` zero bytes
/// follow, which is not a valid zlib stream.
pub fn color_profile_dos(
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
    format: ContainerFormat,
) -> Result<Artifact> {
    if format != ContainerFormat::Png {
        return Err(SpliceError::unsupported_target(
            SynthesisKind::ColorProfileDoS.as_str(),
            format.as_str(),
        ));
    }
    let (w, h) = config.skeleton_dimensions;
    let skeleton = encoder.encode_canvas(w, h, WHITE, format)?;
    let offset = resolve(&skeleton, ContainerFormat::Png, InjectionZone::Body)?;

    let mut data = Vec::with_capacity(config.profile_name.len() + 2 + config.profile_padding);
    data.extend_from_slice(config.profile_name.as_bytes());
    data.push(0);
    // compression method 0 (deflate)
    data.push(0);
    data.resize(data.len() + config.profile_padding, 0);

    let crc = match config.checksums {
        ChecksumMode::Stale => PLACEHOLDER_CRC,
        ChecksumMode::Recompute => png_crc(b"iCCP", &data),
    };
    let chunk = forged_png_chunk(b"iCCP", config.profile_declared_len, &data, crc);
    let bytes = inject(&skeleton, offset, &chunk)?;

    Ok(Artifact {
        kind: SynthesisKind::ColorProfileDoS,
        format,
        dimensions: (w, h),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chunk::{read_u16_be, read_u16_le, read_u32_be, PNG_SIGNATURE};
    use crate::engine::encoder::ImageCrateEncoder;
    use crate::error::ErrorCategory;

    /// Fails every canvas above `max_pixels`, recording what was asked for.
    struct LadderEncoder {
        max_pixels: u64,
        attempts: Mutex<Vec<(u32, u32)>>,
    }

    impl LadderEncoder {
        fn new(max_pixels: u64) -> Self {
            Self {
                max_pixels,
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    impl CanvasEncoder for LadderEncoder {
        fn encode_canvas(
            &self,
            width: u32,
            height: u32,
            _color: [u8; 3],
            _format: ContainerFormat,
        ) -> Result<Vec<u8>> {
            self.attempts.lock().push((width, height));
            let pixels = width as u64 * height as u64;
            if pixels > self.max_pixels {
                return Err(SpliceError::allocation_failed(width, height, pixels * 3));
            }
            Ok(b"canvas".to_vec())
        }
    }

    /// Walk JPEG segments from SOI, returning (marker, length field, offset).
    fn jpeg_segments(bytes: &[u8]) -> Vec<(u8, u16, usize)> {
        let mut out = Vec::new();
        let mut pos = 2;
        while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
            let marker = bytes[pos + 1];
            let len = read_u16_be(bytes, pos + 2).unwrap();
            out.push((marker, len, pos));
            if marker == 0xDA {
                break;
            }
            pos += 2 + len as usize;
        }
        out
    }

    mod pixel_flood {
        use super::*;

        #[test]
        fn largest_rung_wins_when_it_fits() {
            let enc = LadderEncoder::new(u64::MAX);
            let art = pixel_flood(&enc, &SynthesisConfig::default(), ContainerFormat::Png).unwrap();
            assert_eq!(art.dimensions, (10_000, 10_000));
            assert_eq!(enc.attempts.lock().len(), 1);
        }

        #[test]
        fn falls_back_to_next_rung() {
            let enc = LadderEncoder::new(50_000_000);
            let art = pixel_flood(&enc, &SynthesisConfig::default(), ContainerFormat::Png).unwrap();
            assert_eq!(art.dimensions, (5_000, 5_000));
            assert_eq!(
                *enc.attempts.lock(),
                vec![(10_000, 10_000), (5_000, 5_000)]
            );
        }

        #[test]
        fn smallest_rung_is_last_resort() {
            let enc = LadderEncoder::new(4_000_000);
            let art = pixel_flood(&enc, &SynthesisConfig::default(), ContainerFormat::Png).unwrap();
            assert_eq!(art.dimensions, (2_000, 2_000));
            assert_eq!(enc.attempts.lock().len(), 3);
        }

        #[test]
        fn fails_only_when_every_rung_fails() {
            let enc = LadderEncoder::new(1);
            let err =
                pixel_flood(&enc, &SynthesisConfig::default(), ContainerFormat::Png).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::ResourceExhaustion);
            assert!(err.to_string().contains("3 attempts"));
            assert_eq!(enc.attempts.lock().len(), 3);
        }

        #[test]
        fn empty_ladder_is_exhausted() {
            let config = SynthesisConfig {
                flood_rungs: Vec::new(),
                ..SynthesisConfig::default()
            };
            let err = pixel_flood(&LadderEncoder::new(u64::MAX), &config, ContainerFormat::Png)
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::ResourceExhaustion);
        }

        #[test]
        fn real_encoder_with_small_rungs() {
            let config = SynthesisConfig {
                flood_rungs: vec![(64, 48)],
                ..SynthesisConfig::default()
            };
            let art = pixel_flood(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            let img = image::load_from_memory(&art.bytes).unwrap();
            assert_eq!((img.width(), img.height()), (64, 48));
        }
    }

    mod long_body {
        use super::*;

        #[test]
        fn jpeg_comment_length_counts_itself() {
            let art = long_body(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Jpeg,
            )
            .unwrap();
            let com: Vec<_> = jpeg_segments(&art.bytes)
                .into_iter()
                .filter(|(marker, _, _)| *marker == JPEG_COM)
                .collect();
            assert_eq!(com.len(), 1);
            let (_, len, at) = com[0];
            assert_eq!(len as usize, MAX_JPEG_COMMENT_LEN + 2);
            assert_eq!(len, u16::MAX);
            assert!(art.bytes[at + 4..at + 4 + MAX_JPEG_COMMENT_LEN]
                .iter()
                .all(|&b| b == b'A'));
        }

        #[test]
        fn jpeg_comment_follows_app_segments_and_stays_decodable() {
            let config = SynthesisConfig {
                comment_len: 1_000,
                ..SynthesisConfig::default()
            };
            let art = long_body(&ImageCrateEncoder, &config, ContainerFormat::Jpeg).unwrap();
            let segments = jpeg_segments(&art.bytes);
            let com_index = segments.iter().position(|s| s.0 == JPEG_COM).unwrap();
            assert!(segments[..com_index]
                .iter()
                .all(|s| (0xE0..=0xEF).contains(&s.0)));
            assert_eq!(segments[com_index].1, 1_002);

            let img = image::load_from_memory(&art.bytes).unwrap();
            assert_eq!((img.width(), img.height()), (100, 100));
        }

        #[test]
        fn oversized_comment_is_rejected() {
            let config = SynthesisConfig {
                comment_len: MAX_JPEG_COMMENT_LEN + 1,
                ..SynthesisConfig::default()
            };
            let err = long_body(&ImageCrateEncoder, &config, ContainerFormat::Jpeg).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::InvalidInput);
        }

        #[test]
        fn png_text_budget_is_spread_evenly() {
            let config = SynthesisConfig {
                text_entries: 7,
                text_budget: 1_000,
                ..SynthesisConfig::default()
            };
            let art = long_body(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            let png = Png::from_bytes(Bytes::from(art.bytes.clone())).unwrap();

            let texts: Vec<_> = png
                .chunks()
                .iter()
                .filter(|c| c.kind() == *b"tEXt")
                .map(|c| c.contents().clone())
                .collect();
            assert_eq!(texts.len(), 7);
            assert_eq!(png.chunks()[0].kind(), *b"IHDR");
            assert_eq!(png.chunks()[1].kind(), *b"tEXt");

            let text_lens: Vec<usize> = texts
                .iter()
                .map(|c| c.len() - c.iter().position(|&b| b == 0).unwrap() - 1)
                .collect();
            assert_eq!(text_lens.iter().sum::<usize>(), 1_000);
            assert!(text_lens.iter().all(|&n| n == 142 || n == 143));
            assert!(texts[0].starts_with(b"Comment0\0"));
        }

        #[test]
        fn png_default_budget_is_about_100_kib_and_decodable() {
            let art = long_body(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Png,
            )
            .unwrap();
            assert!(art.bytes.len() > 100 * KIB);
            let img = image::load_from_memory(&art.bytes).unwrap();
            assert_eq!((img.width(), img.height()), (100, 100));
        }

        #[test]
        fn gif_target_is_unsupported() {
            let err = long_body(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Gif,
            )
            .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::InvalidInput);
        }
    }

    mod decompression_bomb {
        use super::*;

        #[test]
        fn png_ihdr_declares_large_dimensions() {
            let art = decompression_bomb(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Png,
            )
            .unwrap();
            assert_eq!(&art.bytes[..8], &PNG_SIGNATURE);
            assert_eq!(&art.bytes[12..16], b"IHDR");
            assert_eq!(read_u32_be(&art.bytes, 16), Some(30_000));
            assert_eq!(read_u32_be(&art.bytes, 20), Some(30_000));
            assert!(art.bytes.len() < 1024);
            assert_eq!(art.dimensions, (30_000, 30_000));
        }

        #[test]
        fn size_does_not_depend_on_declared_dimensions() {
            let small = SynthesisConfig {
                bomb_dimensions: (2, 2),
                ..SynthesisConfig::default()
            };
            let huge = SynthesisConfig {
                bomb_dimensions: (u32::MAX >> 1, u32::MAX >> 1),
                ..SynthesisConfig::default()
            };
            let a = decompression_bomb(&ImageCrateEncoder, &small, ContainerFormat::Png).unwrap();
            let b = decompression_bomb(&ImageCrateEncoder, &huge, ContainerFormat::Png).unwrap();
            assert_eq!(a.bytes.len(), b.bytes.len());
            assert!(b.bytes.len() < 1024);
        }

        #[test]
        fn png_crc_is_stale_unless_recomputed() {
            let stale = decompression_bomb(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Png,
            )
            .unwrap();
            let expected = png_crc(b"IHDR", &stale.bytes[16..29]);
            assert_ne!(read_u32_be(&stale.bytes, 29), Some(expected));

            let config = SynthesisConfig {
                checksums: ChecksumMode::Recompute,
                ..SynthesisConfig::default()
            };
            let fixed =
                decompression_bomb(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            assert_eq!(read_u32_be(&fixed.bytes, 29), Some(expected));
        }

        #[test]
        fn jpeg_frame_header_declares_large_dimensions() {
            let art = decompression_bomb(
                &ImageCrateEncoder,
                &SynthesisConfig::default(),
                ContainerFormat::Jpeg,
            )
            .unwrap();
            let sof = find_jpeg_frame_header(&art.bytes).unwrap();
            assert_eq!(read_u16_be(&art.bytes, sof + 5), Some(30_000));
            assert_eq!(read_u16_be(&art.bytes, sof + 7), Some(30_000));
        }

        #[test]
        fn gif_screen_descriptor_declares_large_dimensions() {
            let config = SynthesisConfig {
                bomb_dimensions: (30_000, 20_000),
                ..SynthesisConfig::default()
            };
            let art = decompression_bomb(&ImageCrateEncoder, &config, ContainerFormat::Gif).unwrap();
            assert_eq!(&art.bytes[..3], b"GIF");
            assert_eq!(read_u16_le(&art.bytes, 6), Some(30_000));
            assert_eq!(read_u16_le(&art.bytes, 8), Some(20_000));
        }

        #[test]
        fn sixteen_bit_formats_reject_wide_values() {
            let config = SynthesisConfig {
                bomb_dimensions: (70_000, 1),
                ..SynthesisConfig::default()
            };
            for format in [ContainerFormat::Jpeg, ContainerFormat::Gif] {
                let err = decompression_bomb(&ImageCrateEncoder, &config, format).unwrap_err();
                assert_eq!(err.category(), ErrorCategory::InvalidInput);
            }
        }

        #[test]
        fn skeleton_without_ihdr_is_reported() {
            let mut bytes = PNG_SIGNATURE.to_vec();
            let err = rewrite_dimensions(
                &mut bytes,
                ContainerFormat::Png,
                1,
                1,
                ChecksumMode::Stale,
            )
            .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::UnexpectedFailure);
        }
    }

    mod color_profile {
        use super::*;

        #[test]
        fn forged_chunk_sits_before_first_idat() {
            let config = SynthesisConfig::default();
            let skeleton = ImageCrateEncoder
                .encode_canvas(100, 100, WHITE, ContainerFormat::Png)
                .unwrap();
            let idat = find_png_chunk(&skeleton, b"IDAT").unwrap();

            let art = color_profile_dos(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            assert_eq!(&art.bytes[..idat], &skeleton[..idat]);
            assert_eq!(read_u32_be(&art.bytes, idat), Some(100 * MIB));
            assert_eq!(&art.bytes[idat + 4..idat + 8], b"iCCP");
            assert_eq!(&art.bytes[idat + 8..idat + 16], b"Profile\0");

            let data_len = "Profile".len() + 2 + config.profile_padding;
            let crc_at = idat + 8 + data_len;
            assert_eq!(read_u32_be(&art.bytes, crc_at), Some(PLACEHOLDER_CRC));
            assert_eq!(&art.bytes[crc_at + 4..], &skeleton[idat..]);
        }

        #[test]
        fn written_data_is_tiny_compared_to_declared() {
            let config = SynthesisConfig::default();
            let skeleton_len = ImageCrateEncoder
                .encode_canvas(100, 100, WHITE, ContainerFormat::Png)
                .unwrap()
                .len();
            let art = color_profile_dos(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            assert_eq!(art.bytes.len(), skeleton_len + 12 + "Profile".len() + 2 + 64);
        }

        #[test]
        fn recomputed_crc_covers_written_data() {
            let config = SynthesisConfig {
                checksums: ChecksumMode::Recompute,
                ..SynthesisConfig::default()
            };
            let art = color_profile_dos(&ImageCrateEncoder, &config, ContainerFormat::Png).unwrap();
            let at = find_png_chunk(&art.bytes, b"IDAT");
            // the forged length sends the walker past the end of the file
            assert_eq!(at, None);

            let iccp = crate::engine::locate::find(&art.bytes, b"iCCP").unwrap() - 4;
            let data_len = "Profile".len() + 2 + config.profile_padding;
            let data = &art.bytes[iccp + 8..iccp + 8 + data_len];
            assert_eq!(
                read_u32_be(&art.bytes, iccp + 8 + data_len),
                Some(png_crc(b"iCCP", data))
            );
        }

        #[test]
        fn non_png_targets_are_rejected() {
            for format in [ContainerFormat::Jpeg, ContainerFormat::Gif] {
                let err =
                    color_profile_dos(&ImageCrateEncoder, &SynthesisConfig::default(), format)
                        .unwrap_err();
                assert_eq!(err.category(), ErrorCategory::InvalidInput);
            }
        }
    }

    #[test]
    fn build_maps_generic_targets_to_png() {
        let art = build(
            SynthesisKind::DecompressionBomb,
            ContainerFormat::Generic,
            &ImageCrateEncoder,
            &SynthesisConfig::default(),
        )
        .unwrap();
        assert_eq!(art.format, ContainerFormat::Png);
        assert_eq!(&art.bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn build_converts_builder_panics() {
        struct PanickingEncoder;
        impl CanvasEncoder for PanickingEncoder {
            fn encode_canvas(
                &self,
                _: u32,
                _: u32,
                _: [u8; 3],
                _: ContainerFormat,
            ) -> Result<Vec<u8>> {
                panic!("encoder exploded")
            }
        }
        let err = build(
            SynthesisKind::LongBody,
            ContainerFormat::Png,
            &PanickingEncoder,
            &SynthesisConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnexpectedFailure);
        assert!(err.to_string().contains("synth:long_body"));

        // the lock is not poisoned: later builds still run
        assert!(build(
            SynthesisKind::DecompressionBomb,
            ContainerFormat::Png,
            &ImageCrateEncoder,
            &SynthesisConfig::default(),
        )
        .is_ok());
    }
}

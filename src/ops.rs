// src/ops.rs
//
// Plain data describing what to build.
// These are cheap to create and copy - the byte work happens in engine/.

use std::fmt;

/// Container format of an image, derived from its file extension.
///
/// `Generic` means "no format-specific logic": header injection lands at
/// offset 0 and body injection at the raw midpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Png,
    Jpeg,
    Gif,
    Generic,
}

impl ContainerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Generic => "generic",
        }
    }

    /// Fixed header-zone offset: just past the signature / SOI / header block.
    pub fn header_offset(&self) -> usize {
        match self {
            Self::Png => 8,
            Self::Jpeg => 2,
            Self::Gif => 6,
            Self::Generic => 0,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where injected bytes land relative to the file structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InjectionZone {
    Header,
    Body,
    Trailer,
}

impl InjectionZone {
    pub const ALL: [InjectionZone; 3] = [Self::Header, Self::Body, Self::Trailer];

    /// Mutation number used in output file names (`_m1`, `_m2`, `_m3`).
    pub fn mutation_number(&self) -> u8 {
        match self {
            Self::Header => 1,
            Self::Body => 2,
            Self::Trailer => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Trailer => "trailer",
        }
    }
}

impl fmt::Display for InjectionZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed artifacts the synthesizer knows how to forge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SynthesisKind {
    /// Huge opaque canvas, largest rung that the encoder accepts.
    PixelFlood,
    /// Skeleton image with an oversized metadata section.
    LongBody,
    /// Tiny image whose declared dimensions are enormous.
    DecompressionBomb,
    /// Forged iCCP chunk declaring a very large length.
    ColorProfileDoS,
}

impl SynthesisKind {
    /// Order in which a synthesis run builds artifacts.
    pub const ALL: [SynthesisKind; 4] = [
        Self::PixelFlood,
        Self::LongBody,
        Self::DecompressionBomb,
        Self::ColorProfileDoS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PixelFlood => "pixel_flood",
            Self::LongBody => "long_body",
            Self::DecompressionBomb => "decompression",
            Self::ColorProfileDoS => "color_profile",
        }
    }

    /// Default output file name used by a synthesis run.
    pub fn default_file_name(&self) -> String {
        format!("dos_{}.png", self.as_str())
    }
}

impl fmt::Display for SynthesisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with CRC fields covering chunks we rewrote or forged.
///
/// Downstream decoders are assumed lenient, so the default leaves them stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChecksumMode {
    #[default]
    Stale,
    Recompute,
}

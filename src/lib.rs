// lib.rs
//
// image-splice: test-artifact generator for image-upload pipelines
//
// Two jobs:
// - Splice payload bytes into copies of existing images at a header, body or
//   trailer offset chosen per container format
// - Synthesize hostile images (pixel flood, long body, decompression bomb,
//   color-profile DoS) from small encoded skeletons
//
// Outputs are intentionally malformed. Nothing here validates or repairs them.

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    classify, inject, inject_at_zone, inject_payload, load_payloads, resolve, run_batch,
    synthesize, synthesize_all, BatchConfig, BatchReport, CanvasEncoder, ImageCrateEncoder,
    LocalFs, RawImage, Storage, SynthesisConfig, SynthesisReport,
};
pub use error::{ErrorCategory, Result, SpliceError};
pub use ops::{ChecksumMode, ContainerFormat, InjectionZone, SynthesisKind};

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Extensions with a dedicated offset heuristic. Anything else is generic.
pub fn supported_input_formats() -> Vec<&'static str> {
    vec!["png", "jpg", "jpeg", "gif"]
}

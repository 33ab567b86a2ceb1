// src/engine.rs
//
// The core of image-splice. Two families of work:
// 1. Payload injection: resolve a zone offset, splice bytes, persist
// 2. Artifact synthesis: build structurally hostile images from a skeleton
//
// This file is a facade over the modules in engine/

mod batch;
mod chunk;
mod common;
mod encoder;
mod inject;
mod io;
mod locate;
mod pool;
mod sniff;
mod synth;

pub use batch::{
    inject_payload, output_file_name, run_batch, sanitize_base_name, synthesize, synthesize_all,
    BatchConfig, BatchReport, MutationFailure, SynthesisOutcome, SynthesisReport,
};
pub use chunk::{
    find_jpeg_frame_header, find_png_chunk, png_crc, recompute_crc, recompute_declared_crc,
    PLACEHOLDER_CRC, PNG_SIGNATURE,
};
pub use common::run_with_panic_policy;
pub use encoder::{allocate_canvas, encode_rgb, CanvasEncoder, ImageCrateEncoder};
pub use inject::{inject, inject_at_zone};
pub use io::{load_payloads, LocalFs, RawImage, Storage};
pub use locate::resolve;
pub use pool::{default_worker_count, get_pool, MAX_WORKER_THREADS, MIN_WORKER_THREADS};
pub use sniff::classify;
pub use synth::{build, rewrite_dimensions, target_format, Artifact, SynthesisConfig};

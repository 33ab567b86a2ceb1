// src/engine/batch.rs
//
// Run-level interfaces: single injections, batch mutation runs over
// images x payloads, and synthesis runs.
//
// Units share no mutable state: inputs are read-only and every output path is
// derived deterministically from (image, payload index, zone). A failing
// mutation is recorded and its siblings keep going.

use crate::engine::common::run_with_panic_policy;
use crate::engine::encoder::CanvasEncoder;
use crate::engine::inject::inject_at_zone;
use crate::engine::io::{RawImage, Storage};
use crate::engine::pool::get_pool;
use crate::engine::sniff::classify;
use crate::engine::synth::{self, SynthesisConfig};
use crate::error::{ErrorCategory, Result, SpliceError};
use crate::ops::{InjectionZone, SynthesisKind};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Read `input`, splice `payload` into `zone`, write the result to `output`.
pub fn inject_payload(
    storage: &dyn Storage,
    input: &Path,
    payload: &[u8],
    output: &Path,
    zone: InjectionZone,
) -> Result<()> {
    let image = storage.read(input)?;
    inject_loaded(storage, input, &image, payload, output, zone)
}

fn inject_loaded(
    storage: &dyn Storage,
    input: &Path,
    image: &RawImage,
    payload: &[u8],
    output: &Path,
    zone: InjectionZone,
) -> Result<()> {
    let mutated = inject_at_zone(image.as_bytes(), classify(input), zone, payload)?;
    storage.write(output, &mutated)
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_base_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<sanitizedBaseName>_p<payloadIndex>_m<mutationNumber><originalExtension>`.
///
/// `payload_index` is 1-based; the extension keeps its original spelling.
pub fn output_file_name(input: &Path, payload_index: usize, zone: InjectionZone) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "{}_p{}_m{}{}",
        sanitize_base_name(&stem),
        payload_index,
        zone.mutation_number(),
        ext
    )
}

/// Settings for a batch mutation run.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    /// Worker threads; `None` sizes the pool from available parallelism.
    pub threads: Option<usize>,
    /// Zones applied to every unit, in order.
    pub zones: Vec<InjectionZone>,
    /// Checked between units; in-flight units always finish.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl BatchConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            threads: None,
            zones: InjectionZone::ALL.to_vec(),
            cancel: None,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// One failed mutation, attributed to its unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationFailure {
    pub image: String,
    /// 1-based, as in output names.
    pub payload_index: usize,
    pub zone: InjectionZone,
    pub category: ErrorCategory,
    pub message: String,
}

/// Aggregate counts for a batch run. Counts are per mutation, not per unit.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub units: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<MutationFailure>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Process exit status: non-zero when anything failed or was skipped.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 && self.skipped == 0 {
            0
        } else {
            1
        }
    }

    fn absorb(mut self, other: BatchReport) -> BatchReport {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self
    }
}

/// Mutate every input with every payload in each configured zone.
///
/// Fails up front (before any output is written) when an input is missing,
/// the payload list is empty, or two inputs would produce the same output
/// names. After that, failures are only ever recorded in the report.
pub fn run_batch(
    storage: &dyn Storage,
    inputs: &[PathBuf],
    payloads: &[Vec<u8>],
    config: &BatchConfig,
) -> Result<BatchReport> {
    let started = Instant::now();
    validate_batch(storage, inputs, payloads)?;
    let pool = get_pool(config.threads)?;

    let units: Vec<(usize, usize)> = (0..inputs.len())
        .flat_map(|image| (0..payloads.len()).map(move |payload| (image, payload)))
        .collect();

    let report = pool.install(|| {
        let images: Vec<Result<RawImage>> = inputs
            .par_iter()
            .map(|path| run_with_panic_policy("batch:read", || storage.read(path)))
            .collect();

        units
            .par_iter()
            .map(|&(image, payload)| {
                run_unit(
                    storage,
                    &inputs[image],
                    &images[image],
                    payload,
                    &payloads[payload],
                    config,
                )
            })
            .reduce(BatchReport::default, BatchReport::absorb)
    });

    let report = BatchReport {
        units: units.len(),
        elapsed: started.elapsed(),
        ..report
    };
    info!(
        target: "image_splice::batch",
        units = report.units,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch finished"
    );
    Ok(report)
}

fn validate_batch(storage: &dyn Storage, inputs: &[PathBuf], payloads: &[Vec<u8>]) -> Result<()> {
    if let Some(missing) = inputs.iter().find(|p| !storage.exists(p)) {
        return Err(SpliceError::input_not_found(missing.display().to_string()));
    }
    if payloads.is_empty() {
        return Err(SpliceError::no_payloads("<payload list>"));
    }

    let mut seen: HashMap<String, &Path> = HashMap::with_capacity(inputs.len());
    for input in inputs {
        let name = output_file_name(input, 1, InjectionZone::Header);
        if let Some(first) = seen.insert(name.clone(), input) {
            return Err(SpliceError::invalid_argument(
                "inputs",
                input.display().to_string(),
                format!(
                    "output name {name} collides with the one for {}",
                    first.display()
                ),
            ));
        }
    }
    Ok(())
}

/// One (image, payload) unit: its zones run sequentially.
fn run_unit(
    storage: &dyn Storage,
    input: &Path,
    image: &Result<RawImage>,
    payload_index: usize,
    payload: &[u8],
    config: &BatchConfig,
) -> BatchReport {
    let mut report = BatchReport::default();
    if config.cancelled() {
        report.skipped = config.zones.len();
        return report;
    }

    for &zone in &config.zones {
        let output = config
            .output_dir
            .join(output_file_name(input, payload_index + 1, zone));
        // a failed read fails every mutation of that image
        let outcome = match image {
            Ok(image) => run_with_panic_policy("batch:mutation", || {
                inject_loaded(storage, input, image, payload, &output, zone)
            })
            .map_err(|err| (err.category(), err.to_string())),
            Err(err) => Err((err.category(), err.to_string())),
        };

        match outcome {
            Ok(()) => report.succeeded += 1,
            Err((category, message)) => {
                let failure = MutationFailure {
                    image: input.display().to_string(),
                    payload_index: payload_index + 1,
                    zone,
                    category,
                    message,
                };
                debug!(
                    target: "image_splice::batch",
                    image = %failure.image,
                    payload = failure.payload_index,
                    %zone,
                    category = failure.category.as_str(),
                    error = %failure.message,
                    "mutation failed"
                );
                report.failed += 1;
                report.failures.push(failure);
            }
        }
    }
    report
}

/// Build one artifact and persist it.
pub fn synthesize(
    storage: &dyn Storage,
    kind: SynthesisKind,
    output: &Path,
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
) -> Result<()> {
    let artifact = synth::build(kind, classify(output), encoder, config)?;
    storage.write(output, &artifact.bytes)?;
    info!(
        target: "image_splice::synth",
        %kind,
        path = %output.display(),
        width = artifact.dimensions.0,
        height = artifact.dimensions.1,
        size = artifact.bytes.len(),
        "artifact written"
    );
    Ok(())
}

/// Result of one builder in a synthesis run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub kind: SynthesisKind,
    pub path: PathBuf,
    /// `None` on success.
    pub error: Option<(ErrorCategory, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct SynthesisReport {
    pub outcomes: Vec<SynthesisOutcome>,
    pub elapsed: Duration,
}

impl SynthesisReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 {
            0
        } else {
            1
        }
    }
}

/// Build all four artifacts into `output_dir`, one after another.
///
/// Builders never run concurrently: they may try very large allocations. A
/// failing builder is reported and the remaining ones still run.
pub fn synthesize_all(
    storage: &dyn Storage,
    output_dir: &Path,
    encoder: &dyn CanvasEncoder,
    config: &SynthesisConfig,
) -> SynthesisReport {
    let started = Instant::now();
    let outcomes = SynthesisKind::ALL
        .iter()
        .map(|&kind| {
            let path = output_dir.join(kind.default_file_name());
            let error = match synthesize(storage, kind, &path, encoder, config) {
                Ok(()) => None,
                Err(err) => {
                    warn!(
                        target: "image_splice::synth",
                        %kind,
                        category = err.category().as_str(),
                        error = %err,
                        "artifact failed"
                    );
                    Some((err.category(), err.to_string()))
                }
            };
            SynthesisOutcome { kind, path, error }
        })
        .collect();

    let report = SynthesisReport {
        outcomes,
        elapsed: started.elapsed(),
    };
    info!(
        target: "image_splice::synth",
        succeeded = report.succeeded(),
        failed = report.failed(),
        "synthesis finished"
    );
    report
}

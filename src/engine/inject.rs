// src/engine/inject.rs
//
// Payload splicing. Pure byte work: no validation, no I/O.

use crate::engine::locate::resolve;
use crate::error::{Result, SpliceError};
use crate::ops::{ContainerFormat, InjectionZone};

/// Return `bytes[..offset] ++ payload ++ bytes[offset..]`.
///
/// The output is always `bytes.len() + payload.len()` long and both halves of
/// the input are preserved byte-for-byte around the splice. An offset past the
/// end is rejected rather than clamped so that callers never silently move a
/// payload.
pub fn inject(bytes: &[u8], offset: usize, payload: &[u8]) -> Result<Vec<u8>> {
    if offset > bytes.len() {
        return Err(SpliceError::invalid_argument(
            "offset",
            offset.to_string(),
            format!("must be at most the input length ({})", bytes.len()),
        ));
    }
    let (prefix, suffix) = bytes.split_at(offset);
    let mut out = Vec::with_capacity(bytes.len() + payload.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(payload);
    out.extend_from_slice(suffix);
    Ok(out)
}

/// Resolve the insertion point for `zone` and splice `payload` there.
pub fn inject_at_zone(
    bytes: &[u8],
    format: ContainerFormat,
    zone: InjectionZone,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let offset = resolve(bytes, format, zone)?;
    inject(bytes, offset, payload)
}

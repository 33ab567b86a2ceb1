// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the panic policy applied at unit and builder boundaries.

use crate::error::{Result, SpliceError};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, converting a panic into `SpliceError::InternalPanic`.
///
/// `stage` names the boundary (e.g. `"inject:body"`, `"synth:long_body"`) so
/// the resulting error can be attributed without a backtrace.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(SpliceError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

// src/engine/sniff.rs
//
// Container format classification.
//
// Classification is extension-only; file contents are never inspected.
// Everything that needs a format goes through `classify`, so a content-based
// classifier can replace it without touching the resolver or injector.

use crate::ops::ContainerFormat;
use std::path::Path;

/// Classify a path by its (case-insensitive) extension.
pub fn classify(path: impl AsRef<Path>) -> ContainerFormat {
    let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
        return ContainerFormat::Generic;
    };
    match ext.to_ascii_lowercase().as_str() {
        "png" => ContainerFormat::Png,
        "jpg" | "jpeg" => ContainerFormat::Jpeg,
        "gif" => ContainerFormat::Gif,
        _ => ContainerFormat::Generic,
    }
}

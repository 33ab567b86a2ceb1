// src/engine/io.rs
//
// File-system collaborator: RawImage sources, payload lists, and atomic
// output writes.

use crate::error::{Result, SpliceError};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Immutable input bytes, read once and never mutated in place.
#[derive(Clone, Debug)]
pub enum RawImage {
    /// In-memory image data
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
}

impl RawImage {
    /// Map `path` read-only. Empty files are read instead, since a zero-length
    /// mapping is rejected on some platforms.
    pub fn open(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpliceError::input_not_found(display.clone())
            } else {
                SpliceError::file_read_failed(display.clone(), e)
            }
        })?;

        let len = file
            .metadata()
            .map_err(|e| SpliceError::file_read_failed(display.clone(), e))?
            .len();
        if len == 0 {
            return Ok(Self::Memory(Arc::new(Vec::new())));
        }

        // Safety: inputs are treated as read-only for the duration of a run.
        // If another process truncates the file while mapped, reads may fault.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| SpliceError::mmap_failed(display, e))? };
        Ok(Self::Mapped(Arc::new(mmap)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawImage::Memory(data) => data.as_slice(),
            RawImage::Mapped(mmap) => mmap.as_ref(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for RawImage {
    fn from(data: Vec<u8>) -> Self {
        RawImage::Memory(Arc::new(data))
    }
}

/// Reads inputs and persists outputs.
///
/// Implementations must be safe to share across worker threads; every write
/// targets a distinct path, so no coordination between writes is needed.
pub trait Storage: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawImage>;
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// The local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Storage for LocalFs {
    fn read(&self, path: &Path) -> Result<RawImage> {
        RawImage::open(path)
    }

    /// Write via a temp file in the target directory and persist atomically,
    /// creating parent directories as needed.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|e| SpliceError::file_write_failed(dir.display().to_string(), e))?;

        let mut temp_file = NamedTempFile::new_in(dir)
            .map_err(|e| SpliceError::file_write_failed(dir.display().to_string(), e))?;
        temp_file
            .write_all(data)
            .map_err(|e| SpliceError::file_write_failed(path.display().to_string(), e))?;

        temp_file
            .persist(path)
            .map_err(|e| SpliceError::file_write_failed(path.display().to_string(), e.error))?;
        Ok(())
    }
}

/// Load a payload list: one payload per line, surrounding whitespace trimmed,
/// blank lines skipped. Bytes are kept verbatim otherwise (no UTF-8 check).
pub fn load_payloads(path: &Path) -> Result<Vec<Vec<u8>>> {
    let display = path.display().to_string();
    let data = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SpliceError::input_not_found(display.clone())
        } else {
            SpliceError::file_read_failed(display.clone(), e)
        }
    })?;

    let payloads: Vec<Vec<u8>> = data
        .split(|&b| b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect();

    if payloads.is_empty() {
        return Err(SpliceError::no_payloads(display));
    }
    Ok(payloads)
}

//! Variant cache probing for incremental builds.
//!
//! Rendering is the slow part of a build: every `(width, format)` pair is a
//! separate encoder run. Rendered variants are kept in a cache directory
//! between builds, and this module decides which ones still need rendering.
//!
//! # Design
//!
//! The cache is **path-addressed**: a variant is rendered if and only if a
//! file exists at its canonical location under the cache root (see
//! [`crate::variant::canonical_path`]). There is no manifest, no content
//! hash and no mtime comparison. Once a variant exists it is never
//! re-rendered; delete the file (or the whole cache directory) to force it.
//!
//! Probing is done per `(source, width)` pair, because one rendering command
//! covers a single width in several formats.
//!
//! ## I/O errors
//!
//! A probe that fails (permission denied on a cache directory, for example)
//! is reported as [`ProbeError::Io`] instead of being read as "missing".
//! Silently scheduling a re-render would mask the problem and, on the next
//! run, fail the same way.

use crate::format::Format;
use crate::variant::{SiteLayout, SourcePath};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Cannot check cached variant {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Read-only existence check against the cache.
///
/// `Sync` so one probe can be shared by images planned in parallel.
pub trait CacheProbe: Sync {
    fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Probe backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl CacheProbe for FsProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }
}

/// Formats of `formats` not yet present in the cache at `width`.
///
/// Order follows `formats`.
pub fn missing_formats(
    probe: &dyn CacheProbe,
    layout: &SiteLayout,
    source: &SourcePath,
    width: u32,
    formats: &[Format],
) -> Result<Vec<Format>, ProbeError> {
    let mut missing = Vec::new();
    for &format in formats {
        let path = layout.cache_file(source, width, format);
        match probe.exists(&path) {
            Ok(true) => {}
            Ok(false) => missing.push(format),
            Err(source) => return Err(ProbeError::Io { path, source }),
        }
    }
    Ok(missing)
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Variants already present in the cache.
    pub cached: u32,
    /// Variants scheduled for rendering.
    pub pending: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.cached += 1;
    }

    pub fn miss(&mut self) {
        self.pending += 1;
    }

    pub fn total(&self) -> u32 {
        self.cached + self.pending
    }

    pub fn merge(&mut self, other: CacheStats) {
        self.cached += other.cached;
        self.pending += other.pending;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cached > 0 {
            write!(
                f,
                "{} cached, {} to render ({} total)",
                self.cached,
                self.pending,
                self.total()
            )
        } else {
            write!(f, "{} to render", self.pending)
        }
    }
}

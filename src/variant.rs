//! Variant resolution and canonical output paths.
//!
//! A *variant* is one `(width, format)` rendition of a source image. Its
//! location is a pure function of `(source, width, format)`:
//!
//! ```text
//! src="/img/blog/cat.jpg", width 480, avif
//!   source path     img/blog/cat.jpg        (relative to the site base)
//!   canonical path  img/blog/cat_480w.avif
//!   cache file      _cache/img/blog/cat_480w.avif
//!   public URL      /img/blog/cat_480w.avif
//! ```
//!
//! [`canonical_path`] is the only place that formula lives. The cache probe,
//! the task emitter and the markup synthesizer all go through
//! [`SiteLayout`], which wraps it, so markup can never point at a file the
//! rendering tool was told to write somewhere else.

use crate::format::Format;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Path of a source image relative to the site's content root, in posix form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourcePath(String);

impl SourcePath {
    /// Normalise an `<img src>` value against the site base path.
    ///
    /// - query strings and fragments are dropped
    /// - the base path (e.g. `/blog/`) is stripped when present, otherwise a
    ///   single leading `/` is
    /// - leading `./` segments are removed
    pub fn from_src(src: &str, base: &str) -> Self {
        let end = src.find(['?', '#']).unwrap_or(src.len());
        let mut path = &src[..end];

        let base = normalize_base(base);
        if let Some(rest) = path.strip_prefix(base.as_str()) {
            path = rest;
        } else {
            path = path.trim_start_matches('/');
        }
        while let Some(rest) = path.strip_prefix("./") {
            path = rest;
        }
        SourcePath(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory part, empty for images at the content root.
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(i) => &self.0[..i],
            None => "",
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        let name = match self.0.rfind('/') {
            Some(i) => &self.0[i + 1..],
            None => self.0.as_str(),
        };
        match name.rfind('.') {
            Some(i) if i > 0 => &name[..i],
            _ => name,
        }
    }
}

/// Canonical relative path of one variant: `{dir}/{stem}_{width}w.{ext}`.
pub fn canonical_path(source: &SourcePath, width: u32, format: Format) -> String {
    let file = format!("{}_{}w.{}", source.stem(), width, format.extension());
    match source.dir() {
        "" => file,
        dir => format!("{}/{}", dir, file),
    }
}

/// One `(width, format)` rendition of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    pub width: u32,
    pub format: Format,
}

/// Full variant matrix for an image, width-major.
///
/// Cache probing and task emission walk it per width; markup walks it per
/// format. Both orders derive from the same input lists.
pub fn resolve(widths: &[u32], formats: &[Format]) -> Vec<Variant> {
    widths
        .iter()
        .flat_map(|&width| formats.iter().map(move |&format| Variant { width, format }))
        .collect()
}

/// Where sources, cached variants and published URLs live for one site.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    /// URL path the site is served under, always ending in `/`.
    pub base: String,
    /// Root of the variant cache (e.g. `_cache`).
    pub cache_dir: PathBuf,
    /// Directory source images are read from by the rendering tool.
    pub source_dir: PathBuf,
}

impl SiteLayout {
    pub fn new(base: &str, cache_dir: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: normalize_base(base),
            cache_dir: cache_dir.into(),
            source_dir: source_dir.into(),
        }
    }

    pub fn source_path(&self, src: &str) -> SourcePath {
        SourcePath::from_src(src, &self.base)
    }

    pub fn cache_file(&self, source: &SourcePath, width: u32, format: Format) -> PathBuf {
        self.cache_dir.join(canonical_path(source, width, format))
    }

    /// Cache directory mirroring the source's directory.
    pub fn cache_subdir(&self, source: &SourcePath) -> PathBuf {
        match source.dir() {
            "" => self.cache_dir.clone(),
            dir => self.cache_dir.join(dir),
        }
    }

    pub fn source_file(&self, source: &SourcePath) -> PathBuf {
        self.source_dir.join(source.as_str())
    }

    pub fn public_url(&self, source: &SourcePath, width: u32, format: Format) -> String {
        format!("{}{}", self.base, canonical_path(source, width, format))
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::new("/", "_cache", Path::new(""))
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

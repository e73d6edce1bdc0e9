//! Build configuration.
//!
//! Loaded from `picturize.toml` in the working directory (or the file passed
//! with `--config`). The file is optional and sparse: user values are merged
//! on top of the stock defaults, so it only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! formats = ["avif", "webp"]   # Output formats; the first is the <img> fallback
//!
//! [paths]
//! site = "_site"               # Generated site whose pages are rewritten
//! cache = "_cache"             # Rendered variants, kept between builds
//! source = ""                  # Directory the rendering tool reads sources from
//! base = "/"                   # URL path the site is served under
//! publish = "img"              # Cache subtree copied into the site after rendering
//!
//! [render]
//! tool = "npx @squoosh/cli"    # Rendering tool invocation
//! platform = "auto"            # auto | posix | darwin (argument quoting)
//!
//! [processing]
//! on_error = "fail"            # fail | skip (broken <img> handling)
//! max_processes = 4            # Max parallel planning workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::format::Format;
use crate::task::Platform;
use crate::transform::ErrorPolicy;
use crate::variant::SiteLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "picturize.toml";

/// Build configuration loaded from `picturize.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PictureConfig {
    /// Requested output formats, in `<source>` order.
    pub formats: Vec<Format>,
    pub paths: PathsConfig,
    pub render: RenderConfig,
    pub processing: ProcessingConfig,
}

impl Default for PictureConfig {
    fn default() -> Self {
        Self {
            formats: vec![Format::Avif, Format::Webp],
            paths: PathsConfig::default(),
            render: RenderConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PictureConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.formats.is_empty() {
            return Err(ConfigError::Validation("formats must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for format in &self.formats {
            if !seen.insert(format) {
                return Err(ConfigError::Validation(format!(
                    "formats lists '{}' more than once",
                    format
                )));
            }
        }
        if !self.paths.base.starts_with('/') {
            return Err(ConfigError::Validation(
                "paths.base must start with '/'".into(),
            ));
        }
        if self.render.tool.trim().is_empty() {
            return Err(ConfigError::Validation(
                "render.tool must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> SiteLayout {
        SiteLayout::new(&self.paths.base, &self.paths.cache, &self.paths.source)
    }
}

/// Where things live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Generated site whose HTML pages are rewritten in place.
    pub site: PathBuf,
    /// Variant cache root.
    pub cache: PathBuf,
    /// Directory source images are read from, relative paths resolved by the tool.
    pub source: PathBuf,
    /// URL path the site is served under.
    pub base: String,
    /// Subtree of the cache copied into the site at the end of a build.
    pub publish: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            site: PathBuf::from("_site"),
            cache: PathBuf::from("_cache"),
            source: PathBuf::new(),
            base: "/".to_string(),
            publish: PathBuf::from("img"),
        }
    }
}

/// How the rendering tool is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tool: String,
    pub platform: PlatformChoice,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tool: "npx @squoosh/cli".to_string(),
            platform: PlatformChoice::Auto,
        }
    }
}

/// Argument-quoting flavour; `auto` follows the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlatformChoice {
    #[default]
    Auto,
    Posix,
    Darwin,
}

impl PlatformChoice {
    pub fn resolve(self) -> Platform {
        match self {
            PlatformChoice::Auto => Platform::detect(),
            PlatformChoice::Posix => Platform::Posix,
            PlatformChoice::Darwin => Platform::Darwin,
        }
    }
}

/// Planning settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// What happens to an `<img>` that cannot be transformed.
    pub on_error: ErrorPolicy,
    /// Maximum number of parallel planning workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.min(cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PictureConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PictureConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PictureConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<PictureConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `picturize.toml` with all keys explained.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picturize configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Output formats, in <source> order. The first one is also used for the
# fallback <img>. Known formats: avif, webp, jpg, wp2, jxl.
formats = ["avif", "webp"]

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Generated site. Every .html page below it is rewritten in place.
site = "_site"

# Rendered variants. Kept between builds; a variant is only rendered when
# its file is missing here.
cache = "_cache"

# Directory the rendering tool reads source images from. Empty = the
# working directory.
source = ""

# URL path the site is served under.
base = "/"

# Cache subtree copied into the site after rendering.
publish = "img"

# ---------------------------------------------------------------------------
# Rendering tool
# ---------------------------------------------------------------------------
[render]
# Command prefix; resize and encoder flags are appended per image width.
tool = "npx @squoosh/cli"

# Argument quoting: "auto" follows the host, "darwin" double-wraps the
# resize object literal, "posix" wraps it once.
platform = "auto"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# "fail" aborts the build on an <img> without src/width or with a broken
# data-srcset; "skip" leaves that <img> untouched and logs a warning.
on_error = "fail"

# Maximum parallel planning workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

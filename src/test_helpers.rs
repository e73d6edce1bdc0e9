//! Shared test utilities for the picturize test suite.
//!
//! Provides a fixture site copied into a temp directory, a config pointing
//! at it, and two [`TaskRunner`] doubles: one that only records command
//! lines and one that also writes the files the rendering tool would.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let config = fixture_config(tmp.path());
//! let runner = RenderingRunner::new();
//! let report = site::build(&config, &runner, &FsProbe, None).unwrap();
//! assert_eq!(report.executed, runner.lines().len());
//! ```

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::config::PictureConfig;
use crate::format::Format;
use crate::runner::{RunError, TaskRunner};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to `<tmp>/_site` and return the temp directory.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let site = tmp.path().join("_site");
    fs::create_dir_all(&site).unwrap();
    copy_dir_recursive(&fixtures, &site).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Stock config with the site and cache directories under `root`.
pub fn fixture_config(root: &Path) -> PictureConfig {
    let mut config = PictureConfig::default();
    config.paths.site = root.join("_site");
    config.paths.cache = root.join("_cache");
    config
}

// =========================================================================
// Runners
// =========================================================================

/// Records every command line; optionally fails on the n-th (1-based) call.
#[derive(Default)]
pub struct RecordingRunner {
    lines: Mutex<Vec<String>>,
    fail_at: Option<usize>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Default::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl TaskRunner for RecordingRunner {
    fn run(&self, command_line: &str) -> Result<(), RunError> {
        let mut lines = self.lines.lock().unwrap();
        lines.push(command_line.to_string());
        if self.fail_at == Some(lines.len()) {
            return Err(RunError::Spawn {
                command: command_line.to_string(),
                source: io::Error::other("simulated failure"),
            });
        }
        Ok(())
    }
}

/// Behaves like the rendering tool as far as the cache is concerned: writes
/// an empty `<stem><suffix>.<ext>` into the output directory for every
/// requested encoder.
#[derive(Default)]
pub struct RenderingRunner {
    recorder: RecordingRunner,
}

impl RenderingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.recorder.lines()
    }
}

impl TaskRunner for RenderingRunner {
    fn run(&self, command_line: &str) -> Result<(), RunError> {
        self.recorder.run(command_line)?;

        let tokens: Vec<&str> = command_line.split_whitespace().collect();
        let after = |flag: &str| {
            tokens
                .iter()
                .position(|t| *t == flag)
                .and_then(|i| tokens.get(i + 1))
                .copied()
        };
        // Fixture paths have no spaces, so unquoting each token is enough.
        let out_dir = after("--output-dir").unwrap().trim_matches('\'');
        let suffix = after("-s").unwrap().trim_matches('\'');
        let input = tokens.last().unwrap().trim_matches('\'');
        let stem = Path::new(input).file_stem().unwrap().to_string_lossy();

        fs::create_dir_all(out_dir).unwrap();
        for format in Format::ALL {
            if tokens.contains(&format!("--{}", format.encoder_flag()).as_str()) {
                let file = format!("{}{}.{}", stem, suffix, format.extension());
                fs::write(Path::new(out_dir).join(file), b"").unwrap();
            }
        }
        Ok(())
    }
}

//! Rendering commands for the external image tool.
//!
//! Each image width with at least one missing format produces one
//! [`RenderCommand`]. The command is kept structured (program + ordered
//! arguments) until it is handed to the shell; [`RenderCommand::to_shell`]
//! is the only place where quoting happens.
//!
//! ```text
//! npx @squoosh/cli --resize '{width: 480}' --webp auto --output-dir '_cache/img/' -s '_480w' 'img/cat.jpg'
//! ```
//!
//! Paths are single-quoted, with embedded `'` written as `'\''`, so file
//! names with spaces or shell metacharacters reach the tool unchanged.
//!
//! ## Platform quoting
//!
//! The `--resize` value is an object literal that the tool parses itself.
//! On macOS it must reach the tool wrapped in double quotes as well, so it is
//! written `'"{width: 480}"'`; on Linux the extra quotes break parsing and it
//! is written `'{width: 480}'`.

use crate::format::Format;
use crate::variant::{SiteLayout, SourcePath};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host flavour that decides how object-literal arguments are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Posix,
    Darwin,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Posix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Posix => f.write_str("posix"),
            Platform::Darwin => f.write_str("darwin"),
        }
    }
}

/// One argument of a rendering command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Arg {
    /// Written verbatim.
    Plain(String),
    /// Wrapped in single quotes, with embedded quotes escaped.
    Quoted(String),
    /// Object literal parsed by the tool; quoting depends on the platform.
    Object(String),
}

impl Arg {
    fn render(&self, platform: Platform) -> String {
        match self {
            Arg::Plain(s) => s.clone(),
            Arg::Quoted(s) => format!("'{}'", escape_single_quotes(s)),
            Arg::Object(s) => match platform {
                Platform::Darwin => format!("'\"{}\"'", escape_single_quotes(s)),
                Platform::Posix => format!("'{}'", escape_single_quotes(s)),
            },
        }
    }
}

/// Close the quote, emit an escaped `'`, reopen.
fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "'\\''")
}

/// A pending invocation of the rendering tool for one image at one width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderCommand {
    /// Tool invocation prefix, e.g. `npx @squoosh/cli`.
    pub program: String,
    pub args: Vec<Arg>,
    pub source: SourcePath,
    pub width: u32,
    pub formats: Vec<Format>,
}

impl RenderCommand {
    /// Serialise to a single shell command line.
    pub fn to_shell(&self, platform: Platform) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.render(platform));
        }
        line
    }
}

/// Build the command rendering `missing` formats of `source` at `width`.
///
/// Returns `None` when nothing is missing.
pub fn emit(
    tool: &str,
    layout: &SiteLayout,
    source: &SourcePath,
    width: u32,
    missing: &[Format],
) -> Option<RenderCommand> {
    if missing.is_empty() {
        return None;
    }

    let mut args = vec![
        Arg::Plain("--resize".to_string()),
        Arg::Object(format!("{{width: {}}}", width)),
    ];
    for format in missing {
        args.push(Arg::Plain(format!("--{}", format.encoder_flag())));
        args.push(Arg::Plain("auto".to_string()));
    }
    args.push(Arg::Plain("--output-dir".to_string()));
    args.push(Arg::Quoted(format!(
        "{}/",
        layout.cache_subdir(source).to_string_lossy()
    )));
    args.push(Arg::Plain("-s".to_string()));
    args.push(Arg::Quoted(format!("_{}w", width)));
    args.push(Arg::Quoted(
        layout.source_file(source).to_string_lossy().into_owned(),
    ));

    Some(RenderCommand {
        program: tool.to_string(),
        args,
        source: source.clone(),
        width,
        formats: missing.to_vec(),
    })
}

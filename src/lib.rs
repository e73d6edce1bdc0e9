//! # Picturize
//!
//! Post-processes a generated static site: every local `<img>` becomes a
//! responsive `<picture>` with one `<source>` per output format, each listing
//! the image at several widths. Width variants that are not yet rendered are
//! queued as commands for an external image tool (squoosh by default), run
//! once the whole site has been transformed.
//!
//! # Architecture: Plan, Then Render
//!
//! ```text
//! 1. Transform  _site/**/*.html  →  pages rewritten + TaskQueue
//! 2. Render     TaskQueue        →  _cache/         (one command per image width)
//! 3. Publish    _cache/img       →  _site/img
//! ```
//!
//! The transform never waits for rendering. Markup is derived from canonical
//! variant paths alone, so it is the same whether a variant is cached or not,
//! and rendering can happen afterwards in one batch.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`descriptor`] | `data-srcset` parsing (`480w`, `1.5x`) and default widths |
//! | [`format`] | Output formats: extension, MIME type, encoder flag |
//! | [`variant`] | Source paths, canonical variant paths, site layout |
//! | [`cache`] | Existence probe against the variant cache |
//! | [`task`] | Rendering command construction and platform quoting |
//! | [`queue`] | Ordered, de-duplicated command queue |
//! | [`picture`] | `<picture>` fragment synthesis (Maud) |
//! | [`html`] | html5ever DOM access: find, read, replace, serialise |
//! | [`transform`] | Per-image planning and per-page transform |
//! | [`runner`] | Sequential command execution and cache publishing |
//! | [`site`] | Whole-site orchestration: `build` and `plan` |
//! | [`config`] | `picturize.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting of progress events and summaries |
//!
//! # Design Decisions
//!
//! ## Path-Addressed Cache
//!
//! A variant lives at `<cache>/<dir>/<stem>_<width>w.<ext>`. If the file is
//! there it is never rendered again; there is no manifest and no hashing. The
//! rendering tool writes exactly those names (output dir plus `_<width>w`
//! suffix), so probe and tool agree without any shared state.
//!
//! ## Idempotent Re-runs
//!
//! `<img>` elements already inside a `<picture>` are ignored, so running a
//! build over its own output changes nothing and queues nothing once the
//! cache is complete.
//!
//! ## Parallel Planning, Sequential Effects
//!
//! Images of a page are planned in parallel with rayon: planning only reads
//! the cache. DOM replacement, queue appends and command execution happen on
//! one thread, in document order, so the output is deterministic.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod format;
pub mod html;
pub mod output;
pub mod picture;
pub mod queue;
pub mod runner;
pub mod site;
pub mod task;
pub mod transform;
pub mod variant;

#[cfg(test)]
pub(crate) mod test_helpers;

//! CLI output formatting for builds and plans.
//!
//! # Information-First Display
//!
//! Every image is identified by its positional index on the page and its
//! source path. The variant lines below it say what the cache already has
//! and what is about to be rendered, so the output doubles as an inventory
//! of the site's pictures.
//!
//! # Output Format
//!
//! ## Transform
//!
//! ```text
//! blog/post.html (2 images)
//!     001 img/blog/dog.png
//!         200w avif: pending
//!         200w webp: cached
//!     002 https://example.com/banner.png
//!         remote, left as is
//! ```
//!
//! ## Run
//!
//! ```text
//! [1/6] npx @squoosh/cli --resize '{width: 200}' --avif auto ...
//! Published 12 files → _site/img
//! ```
//!
//! ## Summary
//!
//! ```text
//! 3 images on 2 of 3 pages
//! Variants: 6 cached, 12 to render (18 total)
//! Tasks: 6
//! ```
//!
//! # Architecture
//!
//! Each event or result has a `format_*` function (returns `Vec<String>`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::runner::RunEvent;
use crate::site::{BuildEvent, BuildReport, SitePlan};
use crate::transform::{TransformEvent, VariantStatus};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single page transform event as display lines.
pub fn format_transform_event(event: &TransformEvent) -> Vec<String> {
    match event {
        TransformEvent::PageStarted { path, image_count } => {
            vec![format!(
                "{} ({})",
                path,
                plural(*image_count, "image", "images")
            )]
        }
        TransformEvent::ImagePlanned {
            index,
            source,
            variants,
        } => {
            let mut lines = vec![format!("{}{} {}", indent(1), format_index(*index), source)];
            for variant in variants {
                let status = match variant.status {
                    VariantStatus::Cached => "cached",
                    VariantStatus::Pending => "pending",
                };
                lines.push(format!(
                    "{}{}w {}: {}",
                    indent(2),
                    variant.width,
                    variant.format,
                    status
                ));
            }
            lines
        }
        TransformEvent::RemoteSkipped { index, src } => vec![
            format!("{}{} {}", indent(1), format_index(*index), src),
            format!("{}remote, left as is", indent(2)),
        ],
        TransformEvent::ImageFailed { index, reason } => vec![
            format!("{}{} (skipped)", indent(1), format_index(*index)),
            format!("{}{}", indent(2), reason),
        ],
    }
}

/// Format a single queue execution event as display lines.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::TaskStarted {
            index,
            total,
            command,
        } => vec![format!("[{}/{}] {}", index, total, command)],
        RunEvent::Published { files, destination } => vec![format!(
            "Published {} \u{2192} {}",
            plural(*files, "file", "files"),
            destination.display()
        )],
    }
}

pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Transform(e) => format_transform_event(e),
        BuildEvent::Run(e) => format_run_event(e),
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Totals of a plan: images, variants and pending tasks.
pub fn format_plan_summary(plan: &SitePlan) -> Vec<String> {
    let mut lines = vec![format!(
        "{} on {} of {}",
        plural(plan.images_transformed(), "image", "images"),
        plan.pages_changed(),
        plural(plan.pages.len(), "page", "pages")
    )];
    let remote: usize = plan.pages.iter().map(|p| p.remote).sum();
    if remote > 0 {
        lines.push(format!("Remote: {} left as is", remote));
    }
    let failed: usize = plan.pages.iter().map(|p| p.failed).sum();
    if failed > 0 {
        lines.push(format!("Skipped: {}", plural(failed, "image", "images")));
    }
    lines.push(format!("Variants: {}", plan.stats));
    lines.push(format!("Tasks: {}", plan.queue.len()));
    lines
}

pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = format_plan_summary(&report.plan);
    lines.push(format!(
        "Rendered {}, published {}",
        plural(report.executed, "task", "tasks"),
        plural(report.published, "file", "files")
    ));
    lines
}

pub fn print_plan_summary(plan: &SitePlan) {
    for line in format_plan_summary(plan) {
        println!("{}", line);
    }
}

pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

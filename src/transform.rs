//! Per-page `<img>` → `<picture>` transform.
//!
//! For every local `<img>` on a page:
//!
//! ```text
//! attributes ─► ImageReference ─► widths (descriptor) ─┬─► probe ─► RenderCommand(s)
//!                                                      └─► PictureFragment ─► DOM swap
//! ```
//!
//! Planning ([`plan_image`]) touches nothing but the read-only cache probe,
//! so the images of a page are planned in parallel with rayon. Results are
//! collected in document order, and DOM replacement plus queue appends then
//! happen on the calling thread in that same order.
//!
//! ## Remote images
//!
//! `http://`, `https://` and protocol-relative `//` sources are left exactly
//! as they are: no markup change, no rendering.
//!
//! ## Failures
//!
//! A missing `src`/`width` or a malformed `data-srcset` fails the image. The
//! [`ErrorPolicy`] decides whether that fails the page (and the build) or the
//! image is left untouched with a warning.

use crate::cache::{CacheProbe, CacheStats, ProbeError, missing_formats};
use crate::descriptor::{DescriptorError, resolve_widths};
use crate::format::Format;
use crate::html::{self, Document};
use crate::picture::{PictureFragment, synthesize};
use crate::queue::TaskQueue;
use crate::task::{RenderCommand, emit};
use crate::variant::{SiteLayout, SourcePath, resolve};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image is missing {attribute}: {element}")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },
    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Cannot serialize page: {0}")]
    Serialize(#[from] io::Error),
}

/// What to do with an image that cannot be transformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the build.
    #[default]
    Fail,
    /// Leave the `<img>` as it is and log a warning.
    Skip,
}

/// Inputs read from one `<img>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub source: String,
    pub declared_width: u32,
    pub alt: Option<String>,
    pub size_descriptors: Option<String>,
}

/// Result of reading an `<img>`: either a local image to transform or a
/// remote one to leave alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Local(ImageReference),
    Remote(String),
}

impl ImageReference {
    /// Read an image from its attributes.
    ///
    /// `src` is checked first, then remoteness, then `width`, so remote
    /// images without a width are passed through rather than rejected. A
    /// blank `src` counts as missing.
    pub fn read(attr: impl Fn(&str) -> Option<String>) -> Result<ImageSource, ImageError> {
        let source = attr("src")
            .filter(|src| !src.trim().is_empty())
            .ok_or_else(|| ImageError::MissingAttribute {
                attribute: "src",
                element: describe(&attr),
            })?;

        if is_remote(&source) {
            return Ok(ImageSource::Remote(source));
        }

        let declared_width = attr("width")
            .as_deref()
            .and_then(parse_width)
            .ok_or_else(|| ImageError::MissingAttribute {
                attribute: "width",
                element: describe(&attr),
            })?;

        Ok(ImageSource::Local(ImageReference {
            source,
            declared_width,
            alt: attr("alt"),
            size_descriptors: attr("data-srcset"),
        }))
    }
}

pub fn is_remote(src: &str) -> bool {
    let lower = src.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

/// Leading integer of a `width` attribute (`"320"`, `"320px"`); must be > 0.
fn parse_width(value: &str) -> Option<u32> {
    let value = value.trim();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok().filter(|&w| w > 0)
}

fn describe(attr: &impl Fn(&str) -> Option<String>) -> String {
    let mut parts = vec!["<img".to_string()];
    for name in ["src", "width", "alt"] {
        if let Some(value) = attr(name) {
            parts.push(format!("{}=\"{}\"", name, value));
        }
    }
    format!("{}>", parts.join(" "))
}

/// Shared, read-only inputs of a transform run.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub layout: &'a SiteLayout,
    pub formats: &'a [Format],
    pub tool: &'a str,
    pub probe: &'a dyn CacheProbe,
    pub on_error: ErrorPolicy,
}

/// Whether a variant was found in the cache or needs rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Cached,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantInfo {
    pub width: u32,
    pub format: Format,
    pub status: VariantStatus,
}

/// Everything decided for one image.
#[derive(Debug, Clone)]
pub struct ImagePlan {
    pub source: SourcePath,
    pub widths: Vec<u32>,
    pub variants: Vec<VariantInfo>,
    pub commands: Vec<RenderCommand>,
    pub fragment: PictureFragment,
}

impl ImagePlan {
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for v in &self.variants {
            match v.status {
                VariantStatus::Cached => stats.hit(),
                VariantStatus::Pending => stats.miss(),
            }
        }
        stats
    }
}

/// Resolve, probe, emit and synthesize for one local image.
pub fn plan_image(
    reference: &ImageReference,
    ctx: &TransformContext<'_>,
) -> Result<ImagePlan, ImageError> {
    let widths = resolve_widths(
        reference.size_descriptors.as_deref(),
        reference.declared_width,
        &reference.source,
    )?;
    let source = ctx.layout.source_path(&reference.source);

    let mut missing_by_width = Vec::with_capacity(widths.len());
    let mut commands = Vec::new();
    for &width in &widths {
        let missing = missing_formats(ctx.probe, ctx.layout, &source, width, ctx.formats)?;
        if let Some(command) = emit(ctx.tool, ctx.layout, &source, width, &missing) {
            commands.push(command);
        }
        missing_by_width.push((width, missing));
    }

    let variants = resolve(&widths, ctx.formats)
        .into_iter()
        .map(|v| {
            let pending = missing_by_width
                .iter()
                .any(|(w, missing)| *w == v.width && missing.contains(&v.format));
            VariantInfo {
                width: v.width,
                format: v.format,
                status: if pending {
                    VariantStatus::Pending
                } else {
                    VariantStatus::Cached
                },
            }
        })
        .collect();

    let fragment = synthesize(
        ctx.layout,
        ctx.formats,
        &widths,
        &source,
        reference.alt.as_deref(),
        reference.declared_width,
    );

    Ok(ImagePlan {
        source,
        widths,
        variants,
        commands,
        fragment,
    })
}

/// Progress events emitted while transforming pages.
#[derive(Debug, Clone)]
pub enum TransformEvent {
    PageStarted {
        path: String,
        image_count: usize,
    },
    ImagePlanned {
        index: usize,
        source: String,
        variants: Vec<VariantInfo>,
    },
    RemoteSkipped {
        index: usize,
        src: String,
    },
    ImageFailed {
        index: usize,
        reason: String,
    },
}

/// Result of transforming one page.
#[derive(Debug, Default)]
pub struct PageOutcome {
    /// The page markup; the untouched input when nothing was replaced.
    pub html: String,
    pub changed: bool,
    pub queue: TaskQueue,
    pub stats: CacheStats,
    pub transformed: usize,
    pub remote: usize,
    pub failed: usize,
}

/// Transform every `<img>` of a page.
///
/// `page` only labels progress events.
pub fn transform_page(
    page: &str,
    html: &str,
    ctx: &TransformContext<'_>,
    events: Option<&Sender<TransformEvent>>,
) -> Result<PageOutcome, TransformError> {
    let doc = Document::parse(html);
    let nodes = doc.images();

    let send = |event: TransformEvent| {
        if let Some(tx) = events {
            tx.send(event).ok();
        }
    };
    send(TransformEvent::PageStarted {
        path: page.to_string(),
        image_count: nodes.len(),
    });

    let readings: Vec<Result<ImageSource, ImageError>> = nodes
        .iter()
        .map(|node| ImageReference::read(|name| html::attribute(node, name)))
        .collect();

    let plans: Vec<Option<Result<ImagePlan, ImageError>>> = readings
        .par_iter()
        .map(|reading| match reading {
            Ok(ImageSource::Local(reference)) => Some(plan_image(reference, ctx)),
            _ => None,
        })
        .collect();

    let mut outcome = PageOutcome::default();
    for (index, ((node, reading), plan)) in nodes.iter().zip(readings).zip(plans).enumerate() {
        let index = index + 1;
        let result = match (reading, plan) {
            (Ok(ImageSource::Remote(src)), _) => {
                outcome.remote += 1;
                send(TransformEvent::RemoteSkipped { index, src });
                continue;
            }
            (Err(e), _) => Err(e),
            (Ok(ImageSource::Local(_)), Some(plan)) => plan,
            (Ok(ImageSource::Local(_)), None) => continue,
        };

        match result {
            Ok(plan) => {
                if !html::replace_with_picture(node, &plan.fragment) {
                    log::warn!("Image {} is detached from the page, left as is", plan.source.as_str());
                    continue;
                }
                outcome.changed = true;
                outcome.transformed += 1;
                outcome.stats.merge(plan.stats());
                send(TransformEvent::ImagePlanned {
                    index,
                    source: plan.source.as_str().to_string(),
                    variants: plan.variants,
                });
                outcome.queue.extend(plan.commands);
            }
            Err(e) => match ctx.on_error {
                ErrorPolicy::Fail => return Err(e.into()),
                ErrorPolicy::Skip => {
                    log::warn!("Skipping image: {}", e);
                    outcome.failed += 1;
                    send(TransformEvent::ImageFailed {
                        index,
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    outcome.html = if outcome.changed {
        doc.serialize()?
    } else {
        html.to_string()
    };
    Ok(outcome)
}

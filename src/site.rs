//! Whole-site orchestration.
//!
//! ```text
//! _site/**/*.html ──► transform_page (per page, sorted) ──► pages written back
//!                              │
//!                              └─► TaskQueue (merged) ──► run_queue ──► publish
//! ```
//!
//! Pages are visited in sorted path order so the queue, the progress output
//! and the JSON plan are stable between runs. A page is only rewritten when
//! at least one of its images was replaced.
//!
//! [`plan`] stops after the transform and writes nothing: it reports which
//! images would be replaced and which commands would run.

use crate::cache::{CacheProbe, CacheStats};
use crate::config::PictureConfig;
use crate::format::Format;
use crate::queue::TaskQueue;
use crate::runner::{PublishError, RunError, RunEvent, TaskRunner, publish, run_queue};
use crate::task::Platform;
use crate::transform::{TransformContext, TransformError, TransformEvent, transform_page};
use crate::variant::SourcePath;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Site directory not found: {}", .0.display())]
    MissingSite(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot walk site directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{}: {source}", page.display())]
    Page {
        page: PathBuf,
        #[source]
        source: TransformError,
    },
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Progress events of a site build, in emission order.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    Transform(TransformEvent),
    Run(RunEvent),
}

/// Per-page result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// Path relative to the site directory, `/`-separated.
    pub path: String,
    pub transformed: usize,
    pub remote: usize,
    pub failed: usize,
    pub changed: bool,
}

/// Outcome of transforming every page of the site.
#[derive(Debug, Default)]
pub struct SitePlan {
    pub pages: Vec<PageSummary>,
    pub stats: CacheStats,
    pub queue: TaskQueue,
}

impl SitePlan {
    pub fn images_transformed(&self) -> usize {
        self.pages.iter().map(|p| p.transformed).sum()
    }

    pub fn pages_changed(&self) -> usize {
        self.pages.iter().filter(|p| p.changed).count()
    }

    /// Serializable view of the plan, with command lines quoted for
    /// `platform`.
    pub fn manifest(&self, platform: Platform) -> PlanManifest<'_> {
        PlanManifest {
            platform,
            pages: &self.pages,
            stats: self.stats,
            tasks: self
                .queue
                .iter()
                .map(|c| PlannedTask {
                    source: &c.source,
                    width: c.width,
                    formats: &c.formats,
                    command: c.to_shell(platform),
                })
                .collect(),
        }
    }
}

/// JSON shape written by `picturize plan --json`.
#[derive(Debug, Serialize)]
pub struct PlanManifest<'a> {
    pub platform: Platform,
    pub pages: &'a [PageSummary],
    pub stats: CacheStats,
    pub tasks: Vec<PlannedTask<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PlannedTask<'a> {
    pub source: &'a SourcePath,
    pub width: u32,
    pub formats: &'a [Format],
    pub command: String,
}

/// Outcome of a full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub plan: SitePlan,
    /// Rendering commands executed.
    pub executed: usize,
    /// Files copied from the cache into the site.
    pub published: usize,
}

/// All `.html` files under `site_dir`, sorted.
pub fn discover_pages(site_dir: &Path) -> Result<Vec<PathBuf>, SiteError> {
    if !site_dir.is_dir() {
        return Err(SiteError::MissingSite(site_dir.to_path_buf()));
    }
    let mut pages = Vec::new();
    for entry in WalkDir::new(site_dir) {
        let entry = entry?;
        let is_html = entry
            .path()
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if entry.file_type().is_file() && is_html {
            pages.push(entry.into_path());
        }
    }
    pages.sort();
    Ok(pages)
}

/// Transform every page without touching the filesystem or running anything.
pub fn plan(
    config: &PictureConfig,
    probe: &dyn CacheProbe,
    events: Option<&Sender<BuildEvent>>,
) -> Result<SitePlan, SiteError> {
    transform_site(config, probe, false, events)
}

/// Transform and rewrite every page, render missing variants, then publish
/// the cache subtree into the site.
pub fn build(
    config: &PictureConfig,
    runner: &dyn TaskRunner,
    probe: &dyn CacheProbe,
    events: Option<&Sender<BuildEvent>>,
) -> Result<BuildReport, SiteError> {
    let plan = transform_site(config, probe, true, events)?;

    let platform = config.render.platform.resolve();
    let executed = with_forwarding(events, BuildEvent::Run, |tx| {
        run_queue(&plan.queue, runner, platform, tx)
    })?;

    let published = publish(&config.paths.cache, &config.paths.publish, &config.paths.site)?;
    if let Some(tx) = events {
        tx.send(BuildEvent::Run(RunEvent::Published {
            files: published,
            destination: config.paths.site.join(&config.paths.publish),
        }))
        .ok();
    }

    Ok(BuildReport {
        plan,
        executed,
        published,
    })
}

fn transform_site(
    config: &PictureConfig,
    probe: &dyn CacheProbe,
    write: bool,
    events: Option<&Sender<BuildEvent>>,
) -> Result<SitePlan, SiteError> {
    let layout = config.layout();
    let ctx = TransformContext {
        layout: &layout,
        formats: &config.formats,
        tool: &config.render.tool,
        probe,
        on_error: config.processing.on_error,
    };

    let mut plan = SitePlan::default();
    for page in discover_pages(&config.paths.site)? {
        let label = page_label(&config.paths.site, &page);
        let html = fs::read_to_string(&page)?;
        let outcome = with_forwarding(events, BuildEvent::Transform, |tx| {
            transform_page(&label, &html, &ctx, tx)
        })
        .map_err(|source| SiteError::Page {
            page: page.clone(),
            source,
        })?;

        if write && outcome.changed {
            fs::write(&page, &outcome.html)?;
            log::debug!("Rewrote {}", page.display());
        }

        plan.stats.merge(outcome.stats);
        plan.queue.merge(outcome.queue);
        plan.pages.push(PageSummary {
            path: label,
            transformed: outcome.transformed,
            remote: outcome.remote,
            failed: outcome.failed,
            changed: outcome.changed,
        });
    }
    Ok(plan)
}

fn page_label(site_dir: &Path, page: &Path) -> String {
    let relative = page.strip_prefix(site_dir).unwrap_or(page);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Run `f` with a sender whose events are wrapped and forwarded to `events`
/// while `f` is still running.
fn with_forwarding<E, T>(
    events: Option<&Sender<BuildEvent>>,
    wrap: fn(E) -> BuildEvent,
    f: impl FnOnce(Option<&Sender<E>>) -> T,
) -> T
where
    E: Send,
{
    let Some(outer) = events else {
        return f(None);
    };
    let (tx, rx) = mpsc::channel();
    thread::scope(|s| {
        let outer = outer.clone();
        s.spawn(move || {
            for event in rx {
                if outer.send(wrap(event)).is_err() {
                    break;
                }
            }
        });
        let result = f(Some(&tx));
        drop(tx);
        result
    })
}

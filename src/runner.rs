//! Queue execution and publishing.
//!
//! Rendering commands run one at a time, in queue order, each through
//! `sh -c`. The first failing command stops the run; commands after it are
//! not attempted, and variants they would have produced stay missing from
//! the cache, so the next build queues them again.
//!
//! After a successful run the publish subtree of the cache (by default
//! `_cache/img`) is copied into the site directory, which is the only way
//! rendered variants reach the served output.

use crate::queue::TaskQueue;
use crate::task::Platform;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Cannot start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed ({status})")]
    Failed { command: String, status: ExitStatus },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Executes one serialised command line.
///
/// The production implementation is [`ShellRunner`]; tests substitute a
/// recording runner.
pub trait TaskRunner {
    fn run(&self, command_line: &str) -> Result<(), RunError>;
}

/// Runs commands with `sh -c`, inheriting stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl TaskRunner for ShellRunner {
    fn run(&self, command_line: &str) -> Result<(), RunError> {
        log::debug!("sh -c {}", command_line);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .status()
            .map_err(|source| RunError::Spawn {
                command: command_line.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(RunError::Failed {
                command: command_line.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// Progress events emitted while running the queue.
#[derive(Debug, Clone)]
pub enum RunEvent {
    TaskStarted {
        index: usize,
        total: usize,
        command: String,
    },
    Published {
        files: usize,
        destination: PathBuf,
    },
}

/// Run every queued command in order. Returns the number executed.
pub fn run_queue(
    queue: &TaskQueue,
    runner: &dyn TaskRunner,
    platform: Platform,
    events: Option<&Sender<RunEvent>>,
) -> Result<usize, RunError> {
    let total = queue.len();
    for (index, command) in queue.iter().enumerate() {
        let line = command.to_shell(platform);
        if let Some(tx) = events {
            tx.send(RunEvent::TaskStarted {
                index: index + 1,
                total,
                command: line.clone(),
            })
            .ok();
        }
        runner.run(&line)?;
    }
    Ok(total)
}

/// Copy `cache_dir/subtree` into `site_dir/subtree`, overwriting existing
/// files. A missing subtree copies nothing. Returns the number of files
/// copied.
pub fn publish(cache_dir: &Path, subtree: &Path, site_dir: &Path) -> Result<usize, PublishError> {
    let from = cache_dir.join(subtree);
    if !from.is_dir() {
        return Ok(0);
    }
    let to = site_dir.join(subtree);

    let mut copied = 0;
    for entry in WalkDir::new(&from).sort_by_file_name() {
        let entry = entry.map_err(|source| PublishError::Walk {
            path: from.clone(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(&from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::task::emit;
    use crate::test_helpers::RecordingRunner;
    use crate::variant::SiteLayout;
    use tempfile::TempDir;

    fn queue(widths: &[u32]) -> TaskQueue {
        let layout = SiteLayout::default();
        let source = layout.source_path("/img/cat.jpg");
        let mut q = TaskQueue::new();
        for &w in widths {
            q.extend(emit("tool", &layout, &source, w, &[Format::Webp]));
        }
        q
    }

    // =========================================================================
    // run_queue
    // =========================================================================

    #[test]
    fn runs_commands_in_queue_order() {
        let runner = RecordingRunner::new();
        let n = run_queue(&queue(&[100, 200, 300]), &runner, Platform::Posix, None).unwrap();
        assert_eq!(n, 3);
        let lines = runner.lines();
        assert!(lines[0].contains("'_100w'"));
        assert!(lines[1].contains("'_200w'"));
        assert!(lines[2].contains("'_300w'"));
    }

    #[test]
    fn stops_at_first_failure() {
        let runner = RecordingRunner::failing_at(2);
        let err = run_queue(&queue(&[100, 200, 300]), &runner, Platform::Posix, None).unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
        assert_eq!(runner.lines().len(), 2);
    }

    #[test]
    fn empty_queue_runs_nothing() {
        let runner = RecordingRunner::new();
        assert_eq!(run_queue(&TaskQueue::new(), &runner, Platform::Posix, None).unwrap(), 0);
        assert!(runner.lines().is_empty());
    }

    #[test]
    fn emits_task_started_events() {
        let runner = RecordingRunner::new();
        let (tx, rx) = std::sync::mpsc::channel();
        run_queue(&queue(&[100, 200]), &runner, Platform::Darwin, Some(&tx)).unwrap();
        drop(tx);
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            RunEvent::TaskStarted { index: 2, total: 2, command } if command.contains("'\"{width: 200}\"'")
        ));
    }

    #[test]
    fn shell_runner_reports_exit_status() {
        assert!(ShellRunner.run("true").is_ok());
        let err = ShellRunner.run("exit 3").unwrap_err();
        match err {
            RunError::Failed { command, status } => {
                assert_eq!(command, "exit 3");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    // =========================================================================
    // publish
    // =========================================================================

    #[test]
    fn publish_copies_subtree_recursively() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("_cache");
        let site = tmp.path().join("_site");
        fs::create_dir_all(cache.join("img/blog")).unwrap();
        fs::write(cache.join("img/cat_100w.avif"), b"a").unwrap();
        fs::write(cache.join("img/blog/dog_50w.webp"), b"b").unwrap();
        fs::write(cache.join("other.txt"), b"c").unwrap();

        let copied = publish(&cache, Path::new("img"), &site).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read(site.join("img/cat_100w.avif")).unwrap(), b"a");
        assert_eq!(fs::read(site.join("img/blog/dog_50w.webp")).unwrap(), b"b");
        assert!(!site.join("other.txt").exists());
    }

    #[test]
    fn publish_overwrites_existing_files() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("_cache");
        let site = tmp.path().join("_site");
        fs::create_dir_all(cache.join("img")).unwrap();
        fs::create_dir_all(site.join("img")).unwrap();
        fs::write(cache.join("img/cat_100w.avif"), b"new").unwrap();
        fs::write(site.join("img/cat_100w.avif"), b"old").unwrap();

        publish(&cache, Path::new("img"), &site).unwrap();
        assert_eq!(fs::read(site.join("img/cat_100w.avif")).unwrap(), b"new");
    }

    #[test]
    fn publish_missing_subtree_is_noop() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("_site");
        let copied = publish(&tmp.path().join("_cache"), Path::new("img"), &site).unwrap();
        assert_eq!(copied, 0);
        assert!(!site.exists());
    }
}

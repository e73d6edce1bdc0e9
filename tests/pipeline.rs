//! End-to-end builds through the public API.
//!
//! The site generator normally regenerates `_site` from its sources before
//! every picturize run, so each scenario rewrites the original pages between
//! builds and keeps the cache. The rendering tool is replaced by a runner
//! that creates the files squoosh would write.

use picturize::cache::FsProbe;
use picturize::config::{PictureConfig, PlatformChoice};
use picturize::format::Format;
use picturize::runner::{RunError, TaskRunner};
use picturize::site;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

const INDEX: &str = r#"<!DOCTYPE html>
<html><head><title>Home</title></head>
<body>
<img src="/img/cat.jpg" width="300" alt="A cat" data-srcset="300w, 600w">
<img src="//cdn.example.com/logo.svg" alt="Logo">
</body></html>
"#;

const GALLERY: &str = r#"<!DOCTYPE html>
<html><head><title>Gallery</title></head>
<body>
<img src="/img/trips/beach.jpeg" width="400" alt="Beach">
</body></html>
"#;

/// Writes `<stem><suffix>.<ext>` into `--output-dir` for every encoder flag
/// on the command line.
#[derive(Default)]
struct FakeSquoosh {
    lines: Mutex<Vec<String>>,
}

impl FakeSquoosh {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl TaskRunner for FakeSquoosh {
    fn run(&self, command_line: &str) -> Result<(), RunError> {
        self.lines.lock().unwrap().push(command_line.to_string());

        let tokens: Vec<&str> = command_line.split_whitespace().collect();
        let value_of = |flag: &str| {
            let i = tokens.iter().position(|t| *t == flag).unwrap();
            tokens[i + 1]
        };
        let out_dir = Path::new(value_of("--output-dir").trim_matches('\''));
        let suffix = value_of("-s").trim_matches('\'');
        let stem = Path::new(tokens.last().unwrap().trim_matches('\''))
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        fs::create_dir_all(out_dir).unwrap();
        for format in Format::ALL {
            let flag = format!("--{}", format.encoder_flag());
            if tokens.contains(&flag.as_str()) {
                fs::write(
                    out_dir.join(format!("{}{}.{}", stem, suffix, format.extension())),
                    b"",
                )
                .unwrap();
            }
        }
        Ok(())
    }
}

fn setup() -> (TempDir, PictureConfig) {
    let tmp = TempDir::new().unwrap();
    let mut config = PictureConfig::default();
    config.paths.site = tmp.path().join("_site");
    config.paths.cache = tmp.path().join("_cache");
    config.render.platform = PlatformChoice::Posix;
    regenerate_site(&config);
    (tmp, config)
}

fn regenerate_site(config: &PictureConfig) {
    let site = &config.paths.site;
    fs::create_dir_all(site.join("gallery")).unwrap();
    fs::write(site.join("index.html"), INDEX).unwrap();
    fs::write(site.join("gallery/index.html"), GALLERY).unwrap();
}

#[test]
fn first_build_renders_everything_missing() {
    let (_tmp, config) = setup();
    let runner = FakeSquoosh::default();

    let report = site::build(&config, &runner, &FsProbe, None).unwrap();

    // beach: 400, 600, 800; cat: 300, 600
    assert_eq!(report.executed, 5);
    assert_eq!(report.plan.stats.pending, 10);
    assert_eq!(report.published, 10);
    assert!(config.paths.site.join("img/cat_600w.webp").exists());
    assert!(config.paths.site.join("img/trips/beach_800w.avif").exists());

    let index = fs::read_to_string(config.paths.site.join("index.html")).unwrap();
    assert!(index.contains(r#"<source srcset="/img/cat_300w.avif 300w, /img/cat_600w.avif 600w" type="image/avif">"#));
    assert!(index.contains(r#"<img src="//cdn.example.com/logo.svg" alt="Logo">"#));
}

#[test]
fn rebuild_with_warm_cache_renders_nothing() {
    let (_tmp, config) = setup();
    site::build(&config, &FakeSquoosh::default(), &FsProbe, None).unwrap();
    let first_index = fs::read_to_string(config.paths.site.join("index.html")).unwrap();

    regenerate_site(&config);
    let runner = FakeSquoosh::default();
    let report = site::build(&config, &runner, &FsProbe, None).unwrap();

    assert_eq!(report.executed, 0);
    assert!(runner.lines().is_empty());
    assert_eq!(report.plan.stats.pending, 0);
    assert_eq!(report.plan.stats.cached, 10);
    assert_eq!(
        fs::read_to_string(config.paths.site.join("index.html")).unwrap(),
        first_index
    );
}

#[test]
fn deleted_variant_is_rendered_again_alone() {
    let (_tmp, config) = setup();
    site::build(&config, &FakeSquoosh::default(), &FsProbe, None).unwrap();
    fs::remove_file(config.paths.cache.join("img/cat_600w.webp")).unwrap();

    regenerate_site(&config);
    let runner = FakeSquoosh::default();
    site::build(&config, &runner, &FsProbe, None).unwrap();

    let lines = runner.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("--resize '{width: 600}' --webp auto --output-dir"));
    assert!(!lines[0].contains("--avif"));
    assert!(config.paths.cache.join("img/cat_600w.webp").exists());
}

#[test]
fn plan_matches_what_build_runs() {
    let (_tmp, config) = setup();
    let plan = site::plan(&config, &FsProbe, None).unwrap();
    let planned: Vec<String> = plan
        .manifest(config.render.platform.resolve())
        .tasks
        .iter()
        .map(|t| t.command.clone())
        .collect();

    let runner = FakeSquoosh::default();
    site::build(&config, &runner, &FsProbe, None).unwrap();
    assert_eq!(runner.lines(), planned);
}

#[test]
fn transformed_output_is_stable_under_a_second_pass() {
    let (_tmp, config) = setup();
    site::build(&config, &FakeSquoosh::default(), &FsProbe, None).unwrap();
    let before = fs::read_to_string(config.paths.site.join("gallery/index.html")).unwrap();

    let report = site::build(&config, &FakeSquoosh::default(), &FsProbe, None).unwrap();
    assert_eq!(report.plan.pages_changed(), 0);
    assert_eq!(report.executed, 0);
    assert_eq!(
        fs::read_to_string(config.paths.site.join("gallery/index.html")).unwrap(),
        before
    );
}

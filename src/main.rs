use clap::{Parser, Subcommand};
use picturize::cache::FsProbe;
use picturize::config::{self, PictureConfig, PlatformChoice};
use picturize::output;
use picturize::runner::ShellRunner;
use picturize::site::{self, BuildEvent};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

#[derive(Parser)]
#[command(name = "picturize")]
#[command(about = "Turn the <img> tags of a generated site into responsive <picture> elements")]
#[command(long_about = "\
Turn the <img> tags of a generated site into responsive <picture> elements

Every local <img> in the site's HTML pages is replaced by a <picture> with one
<source> per output format, listing the image at several widths. Missing
width variants are rendered by an external tool into a cache directory, which
is then copied into the site.

Image attributes:

  <img src=\"/img/cat.jpg\" width=\"320\" alt=\"A cat\" data-srcset=\"320w, 480w, 640w\">

  src          Image path, relative to the site base. Remote URLs are left alone.
  width        Displayed width in pixels (required).
  alt          Copied to the fallback <img> and to the picture's title.
  data-srcset  Optional widths: absolute (480w) or multiples of width (1.5x).
               Defaults to 1x, 1.5x, 2x.

Variants are only rendered when their file is missing from the cache, so a
second build over the same site does nothing.

Run 'picturize gen-config' to generate a documented picturize.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults apply when missing)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Generated site directory (overrides paths.site)
    #[arg(long, global = true)]
    site: Option<PathBuf>,

    /// Variant cache directory (overrides paths.cache)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Argument quoting for the rendering tool (overrides render.platform)
    #[arg(long, value_enum, global = true)]
    platform: Option<PlatformChoice>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite pages, render missing variants and publish them into the site
    Build,
    /// Show what a build would do without writing or rendering anything
    Plan {
        /// Also write the plan as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print a stock picturize.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_thread_pool(&config.processing);

    match &cli.command {
        Command::Build => {
            println!("==> Building {}", config.paths.site.display());
            let (tx, rx) = mpsc::channel();
            let printer = spawn_printer(rx);
            let result = site::build(&config, &ShellRunner, &FsProbe, Some(&tx));
            drop(tx);
            printer.join().map_err(|_| "output thread panicked")?;
            let report = result?;
            output::print_build_summary(&report);
            println!("==> Build complete: {}", config.paths.site.display());
        }
        Command::Plan { json } => {
            println!("==> Planning {}", config.paths.site.display());
            let (tx, rx) = mpsc::channel();
            let printer = spawn_printer(rx);
            let result = site::plan(&config, &FsProbe, Some(&tx));
            drop(tx);
            printer.join().map_err(|_| "output thread panicked")?;
            let plan = result?;
            output::print_plan_summary(&plan);
            if let Some(path) = json {
                write_plan_json(path, &plan, &config)?;
                println!("Plan written to {}", path.display());
            }
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<PictureConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(site) = &cli.site {
        config.paths.site = site.clone();
    }
    if let Some(cache) = &cli.cache {
        config.paths.cache = cache.clone();
    }
    if let Some(platform) = cli.platform {
        config.render.platform = platform;
    }
    Ok(config)
}

fn write_plan_json(
    path: &Path,
    plan: &site::SitePlan,
    config: &PictureConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = plan.manifest(config.render.platform.resolve());
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn spawn_printer(rx: Receiver<BuildEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    })
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use clap::{Args, Parser, Subcommand};
use gal::config::{self, BuildConfig, GalEnv};
use gal::imaging::{ImageBackend, MagickBackend};
use gal::{build, output, watch};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gal")]
#[command(about = "Gal is a very simple image gallery")]
#[command(long_about = "\
Gal is a very simple image gallery that generates statically.

Every .jpg under the given source directories is resized into two variants
(base and @2x) and collected into a single, shuffled index page:

  <target>/
  ├── index.html            # Every photo, in a fresh random order each build
  ├── robots.txt            # Disallows all crawlers
  ├── assets/css/main.css   # Copied (production) or symlinked (development)
  └── photos/<dir>/         # a.jpg, a@2x.jpg, ...

Resizing is delegated to ImageMagick and MozJPEG; both paths are required
(--magick-bin / MAGICK_BIN, --mozjpeg-bin / MOZJPEG_BIN).")]
#[command(version)]
struct Cli {
    /// Number of build jobs to run in parallel
    #[arg(long, default_value_t = config::DEFAULT_CONCURRENCY, global = true)]
    concurrency: usize,

    /// Path to ImageMagick binary
    #[arg(long, env = "MAGICK_BIN", global = true)]
    magick_bin: Option<PathBuf>,

    /// Path to MozJPEG binary
    #[arg(long, env = "MOZJPEG_BIN", global = true)]
    mozjpeg_bin: Option<PathBuf>,

    /// Run in verbose mode
    #[arg(long, global = true)]
    verbose: bool,

    /// Build environment: production or development
    #[arg(long = "env", env = "GAL_ENV", default_value = "production", global = true)]
    gal_env: GalEnv,

    /// Disable the build cache — force re-encoding of all photos
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every command that runs a build pass.
#[derive(Args)]
struct BuildArgs {
    /// Path to directory where to put output artifacts
    #[arg(short = 't', long)]
    target_dir: PathBuf,

    /// Hand-authored assets; `<asset-dir>/css` is symlinked in development
    #[arg(long, default_value = "assets")]
    asset_dir: PathBuf,

    /// Fixed seed for the index shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Source directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single build pass
    Build(BuildArgs),
    /// Build, then rebuild whenever a source directory changes
    Watch {
        #[command(flatten)]
        args: BuildArgs,

        /// Milliseconds between checks for changes
        #[arg(long, default_value_t = watch::DEFAULT_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
}

impl Cli {
    fn build_config(&self, args: &BuildArgs) -> BuildConfig {
        let mut config = BuildConfig::new(args.paths.clone(), &args.target_dir);
        config.concurrency = self.concurrency;
        config.env = self.gal_env;
        config.asset_dir = args.asset_dir.clone();
        config.verbose = self.verbose;
        config.use_cache = !self.no_cache;
        config.shuffle_seed = args.seed;
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let tools = config::resolve_tools(cli.magick_bin.clone(), cli.mozjpeg_bin.clone())?;
    let backend: Arc<dyn ImageBackend> = Arc::new(MagickBackend::new(tools));

    match &cli.command {
        Command::Build(args) => {
            let config = cli.build_config(args);
            config.validate()?;
            let outcome = build::build(&config, backend)?;
            output::print_outcome(&outcome, config.verbose);
            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Watch { args, interval_ms } => {
            let config = cli.build_config(args);
            config.validate()?;
            watch::watch(&config, backend, Duration::from_millis(*interval_ms), |_| true);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr at INFO, or DEBUG with `--verbose`. `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

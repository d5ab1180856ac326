use clap::{Parser, Subcommand};
use quantum_optimizer::config::{self, Overrides};
use quantum_optimizer::imaging::{Anchor, ImageBackend, OutputFormat, RustBackend, TargetSize};
use quantum_optimizer::{batch, output};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quantum-optimizer")]
#[command(about = "Resize, adjust, watermark and re-encode images")]
#[command(long_about = "\
Resize, adjust, watermark and re-encode images

Each input goes through the same pipeline:

  decode → resize → rotate/flip → brightness/contrast/saturation
         → watermark → encode (optionally searching for a target size)
         → alternate formats

Outputs are written as <name>-optimized.<ext>:

  optimized/
  ├── dawn-optimized.jpg           # primary format (output.format)
  ├── dawn-optimized.webp          # alternates (output.also)
  └── report.json                  # --report

Settings come from quantum-optimizer.toml in the working directory (or
--config), with command-line flags taking precedence.

Run 'quantum-optimizer gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./quantum-optimizer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override config values for a single run.
#[derive(clap::Args)]
struct OptimizeArgs {
    /// Image files or directories to optimize
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "optimized")]
    output: PathBuf,

    /// Output width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Stretch to both --width and --height instead of keeping the aspect ratio
    #[arg(long)]
    no_keep_aspect: bool,

    /// Encode quality, 1-100 (ignored for PNG)
    #[arg(short, long)]
    quality: Option<u32>,

    /// Primary output format: jpeg, png, webp, avif
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Alternate formats, comma separated (e.g. png,webp)
    #[arg(long, value_delimiter = ',')]
    also: Vec<OutputFormat>,

    /// Rotate clockwise by 0, 90, 180 or 270 degrees
    #[arg(long)]
    rotate: Option<u32>,

    /// Mirror left-right
    #[arg(long)]
    flip_h: bool,

    /// Mirror top-bottom
    #[arg(long)]
    flip_v: bool,

    /// Brightness percent (100 = unchanged)
    #[arg(long)]
    brightness: Option<f32>,

    /// Contrast percent (100 = unchanged)
    #[arg(long)]
    contrast: Option<f32>,

    /// Saturation percent (100 = unchanged)
    #[arg(long)]
    saturation: Option<f32>,

    /// Preview blur radius; never applied to written files
    #[arg(long)]
    blur: Option<f32>,

    /// Watermark text (enables the watermark)
    #[arg(long)]
    watermark: Option<String>,

    /// Watermark opacity, 0-100
    #[arg(long)]
    watermark_opacity: Option<u32>,

    /// Watermark position: top-left, top-right, bottom-left, bottom-right, center
    #[arg(long)]
    watermark_position: Option<Anchor>,

    /// Search for the highest quality under this size (e.g. 500KB, 1.5MB)
    #[arg(long)]
    target_size: Option<TargetSize>,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Maximum parallel workers (default: all cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

impl OptimizeArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            format: self.format,
            also: (!self.also.is_empty()).then(|| self.also.clone()),
            quality: self.quality,
            width: self.width,
            height: self.height,
            no_keep_aspect: self.no_keep_aspect,
            rotation: self.rotate,
            flip_horizontal: self.flip_h,
            flip_vertical: self.flip_v,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            blur: self.blur,
            watermark: self.watermark.clone(),
            watermark_opacity: self.watermark_opacity,
            watermark_position: self.watermark_position,
            target_size: self.target_size,
            max_processes: self.jobs,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Optimize images and write the results
    Optimize(OptimizeArgs),
    /// Show format, dimensions and size of images
    Info {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Validate the config without processing anything
    Check,
    /// Print a stock quantum-optimizer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Optimize(args) => {
            let config =
                config::load_layered(Path::new("."), cli.config.as_deref(), &args.overrides())?;
            init_thread_pool(&config.processing);

            let backend = RustBackend::new();
            let inputs = batch::collect_inputs(&args.inputs)?;
            let request = config.to_request();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::optimize_files(&backend, &inputs, &args.output, &request, Some(tx));
            printer.join().ok();
            let report = result?;

            output::print_batch_summary(&report);
            if let Some(path) = &args.report {
                batch::write_report(&report, path)?;
                println!("Report: {}", path.display());
            }
            if !report.failures.is_empty() {
                return Err(format!("{} file(s) failed", report.failures.len()).into());
            }
        }
        Command::Info { inputs } => {
            let backend = RustBackend::new();
            for (i, input) in inputs.iter().enumerate() {
                let bytes = std::fs::read(input)?;
                let info = backend.identify(&bytes)?;
                if i > 0 {
                    println!();
                }
                output::print_info(&input.display().to_string(), &info, bytes.len() as u64);
            }
        }
        Command::Check => {
            let config =
                config::load_layered(Path::new("."), cli.config.as_deref(), &Overrides::default())?;
            let backend = RustBackend::new();
            let supported: Vec<OutputFormat> = OutputFormat::ALL
                .into_iter()
                .filter(|f| backend.supports(*f))
                .collect();
            for line in output::format_supported_formats(&supported) {
                println!("{}", line);
            }
            for format in std::iter::once(config.output.format).chain(config.output.also.clone()) {
                if !backend.supports(format) {
                    log::warn!("{} is not supported by this build", format.label());
                }
            }
            println!("Threads: {}", config::effective_threads(&config.processing));
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `log` output to stderr. `-v` shows per-file results, `-vv` every
/// search probe.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: `-j` can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use clap::{Parser, Subcommand};
use imgshift::catalog::ImageCatalog;
use imgshift::config::{self, ConverterConfig};
use imgshift::convert::Converter;
use imgshift::format::TargetFormat;
use imgshift::imaging::{BackgroundColor, ConvertParams, Quality, RustBackend};
use imgshift::output;
use imgshift::types::SourceImage;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Conversion flags shared by `convert` and `batch`. Each one overrides the
/// matching `[conversion]` config key.
#[derive(clap::Args, Clone)]
struct ConversionArgs {
    /// Target format: png, jpeg (jpg) or webp, or a MIME type
    #[arg(long)]
    to: Option<String>,

    /// Fill behind transparent pixels, as #RGB or #RRGGBB
    #[arg(long)]
    background: Option<String>,

    /// Encoder quality from 0.0 to 1.0 (JPEG only)
    #[arg(long)]
    quality: Option<f32>,
}

impl ConversionArgs {
    fn resolve(&self, config: &ConverterConfig) -> Result<ConvertParams, Box<dyn std::error::Error>> {
        let format = match &self.to {
            Some(raw) => raw.parse::<TargetFormat>()?,
            None => config.conversion.format,
        };
        let mut params = config.params(format);
        if let Some(raw) = &self.background {
            params = params.with_background(Some(raw.parse::<BackgroundColor>()?));
        }
        if let Some(q) = self.quality {
            params = params.with_quality(Quality::checked(q)?);
            if !format.supports_quality() {
                log::warn!("--quality has no effect on {} output", format);
            }
        }
        Ok(params)
    }
}

#[derive(Parser)]
#[command(name = "imgshift")]
#[command(version)]
#[command(about = "Convert images between PNG, JPEG and WebP")]
#[command(long_about = "\
Convert images between PNG, JPEG and WebP

Images are decoded and re-encoded at their native size. Metadata is never
carried over. Transparent pixels are painted over the --background color if
one is given; JPEG output without one gets white.

Batch conversion writes every output into a single zip archive. If any file
fails to convert, no archive is written.

Run 'imgshift gen-config' to generate a documented imgshift.toml.")]
struct Cli {
    /// Config file (default: imgshift.toml in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a single image
    Convert {
        /// Image to convert
        file: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Output path (default: derived name in the working directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert many images into one zip archive
    Batch {
        /// Images or directories (searched recursively for png/jpg/jpeg/webp)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Archive path (default: batch.archive_name in the working directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show size, type, dimensions, alpha and metadata for images
    Inspect {
        /// Images or directories (searched recursively for png/jpg/jpeg/webp)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print JSON instead of the text listing
        #[arg(long)]
        json: bool,
    },
    /// Print a stock imgshift.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            file,
            conversion,
            output: out_arg,
        } => {
            let (config, backend) = setup(cli.config.as_deref())?;
            let params = conversion.resolve(&config)?;
            let source = SourceImage::from_path(&file)?;
            let converter = Converter::new(backend, config.batch_options());
            let result = converter.convert_one(&source, &params)?;

            let out_path = out_arg.unwrap_or_else(|| PathBuf::from(&result.file_name));
            if same_file(&out_path, &file) {
                return Err(format!("refusing to overwrite input {}", file.display()).into());
            }
            std::fs::write(&out_path, &result.bytes)?;
            output::print_conversion(&source.name, &result);
        }
        Command::Batch {
            inputs,
            conversion,
            output: out_arg,
        } => {
            let (config, backend) = setup(cli.config.as_deref())?;
            let params = conversion.resolve(&config)?;
            let sources = read_sources(&collect_inputs(&inputs))?;
            let converter = Converter::new(backend, config.batch_options());

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_convert_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = converter.convert_many(&sources, &params, Some(&tx));
            drop(tx);
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let batch = result?;

            let out_path = out_arg.unwrap_or_else(|| PathBuf::from(&batch.archive.file_name));
            std::fs::write(&out_path, &batch.archive.bytes)?;
            output::print_batch_summary(&batch);
            println!("Wrote {}", out_path.display());
        }
        Command::Inspect { inputs, json } => {
            let (config, backend) = setup(cli.config.as_deref())?;
            let sources = read_sources(&collect_inputs(&inputs))?;
            let catalog = ImageCatalog::with_scan_window(backend, config.limits.scan_window);
            let summary = catalog.add(sources);
            catalog.wait_idle();

            let entries = catalog.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for line in output::format_add_summary(&summary) {
                    println!("{}", line);
                }
                output::print_catalog(&entries);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config, size the worker pool and build the backend.
fn setup(
    config_path: Option<&Path>,
) -> Result<(ConverterConfig, RustBackend), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    init_thread_pool(&config.batch);
    let backend = RustBackend::new().with_max_pixels(config.limits.max_pixels);
    Ok((config, backend))
}

/// Load the explicit config file, or `imgshift.toml` if one exists here.
fn load_config(explicit: Option<&Path>) -> Result<ConverterConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()).into());
            }
            Ok(config::load_config(path)?)
        }
        None => Ok(config::load_config(Path::new(config::DEFAULT_CONFIG_FILE))?),
    }
}

/// Initialize the rayon thread pool based on batch config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(batch: &config::BatchConfig) {
    let threads = config::effective_threads(batch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Expand directories into the image files beneath them, sorted by path.
/// Plain files are kept as given.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let found = WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(TargetFormat::from_extension)
                    .is_some()
            })
            .map(|e| e.into_path());
        files.extend(found);
    }
    files
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceImage>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|p| {
            SourceImage::from_path(p)
                .map_err(|e| -> Box<dyn std::error::Error> {
                    format!("cannot read {}: {e}", p.display()).into()
                })
        })
        .collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

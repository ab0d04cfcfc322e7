//! lowlight CLI: enhance or darken image datasets.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use lowlight_cli::{enhance_dataset, enhance_file, DatasetReport, DriverOptions};
use lowlight_core::{Enhancer, Variant};
use lowlight_enhance::{EnhanceSettings, LowLightSimulator, PipelineBuilder, TraditionalPipeline};
use lowlight_learned::LearnedEnhancer;
use tracing::{info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lowlight")]
#[command(about = "Illumination enhancement for low-light image datasets")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance every image under a directory, mirroring its layout.
    Enhance {
        /// Input dataset root.
        #[arg(long)]
        input: PathBuf,

        /// Output root; created if missing.
        #[arg(long)]
        output: PathBuf,

        /// Write the batch report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Enhance a single image.
    EnhanceImage {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Synthesise a low-light copy of a dataset.
    Darken {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Lower bound of the random darkening gamma.
        #[arg(long, default_value = "0.3")]
        gamma_min: f32,

        /// Upper bound of the random darkening gamma.
        #[arg(long, default_value = "0.7")]
        gamma_max: f32,

        /// Use a fixed gamma of 0.25 instead of a random one.
        #[arg(long)]
        extreme: bool,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Worker threads (default: logical CPUs).
        #[arg(long)]
        workers: Option<usize>,

        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Write a settings file (TOML, or JSON by extension) from a preset.
    InitConfig {
        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = PresetArg::Quality)]
        preset: PresetArg,

        /// Model weights for the learned preset.
        #[arg(long, default_value = "weights/enlightengan.onnx")]
        model: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Simple,
    Enhanced,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Simple => Variant::Simple,
            VariantArg::Enhanced => Variant::Enhanced,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Fast,
    Quality,
    Learned,
}

/// Settings file plus per-value overrides
#[derive(Debug, Clone, Args)]
struct PipelineArgs {
    /// Settings file (TOML, or JSON by extension).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Gamma applied after CLAHE (> 1 brightens).
    #[arg(long)]
    gamma: Option<f32>,

    #[arg(long)]
    clip_limit: Option<f32>,

    /// CLAHE grid as ROWSxCOLS, e.g. 8x8.
    #[arg(long, value_parser = parse_tile_grid)]
    tile_grid: Option<(u32, u32)>,

    #[arg(long)]
    blur_sigma: Option<f32>,

    /// Added to HSV saturation after Retinex.
    #[arg(long, allow_hyphen_values = true)]
    saturation_boost: Option<i32>,

    /// Learned model weights; missing files fall back to the traditional chain.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Per-call inference timeout in milliseconds.
    #[arg(long)]
    model_timeout_ms: Option<u64>,

    /// Worker threads (default: logical CPUs).
    #[arg(long)]
    workers: Option<usize>,
}

fn parse_tile_grid(s: &str) -> Result<(u32, u32), String> {
    let (rows, cols) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got `{}`", s))?;
    let rows = rows.trim().parse::<u32>().map_err(|e| format!("rows: {}", e))?;
    let cols = cols.trim().parse::<u32>().map_err(|e| format!("cols: {}", e))?;
    Ok((rows, cols))
}

impl PipelineArgs {
    fn resolve(&self) -> CliResult<EnhanceSettings> {
        let mut builder = match &self.config {
            Some(path) => EnhanceSettings::load(path)?.to_builder(),
            None => PipelineBuilder::new(),
        };

        if let Some(variant) = self.variant {
            builder = builder.variant(variant.into());
        }
        if let Some(gamma) = self.gamma {
            builder = builder.gamma(gamma);
        }
        if let Some(clip) = self.clip_limit {
            builder = builder.clahe_clip_limit(clip);
        }
        if let Some((rows, cols)) = self.tile_grid {
            builder = builder.clahe_tile_grid(rows, cols);
        }
        if let Some(sigma) = self.blur_sigma {
            builder = builder.retinex_blur_sigma(sigma);
        }
        if let Some(boost) = self.saturation_boost {
            builder = builder.saturation_boost(boost);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(timeout) = self.model_timeout_ms {
            builder = builder.model_timeout_ms(timeout);
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }

        Ok(builder.to_config()?)
    }
}

/// Learned adapter when a model is configured, traditional chain otherwise
fn build_enhancer(settings: &EnhanceSettings) -> CliResult<Box<dyn Enhancer>> {
    match &settings.model {
        Some(model) => {
            let mut model = model.clone();
            // One session per pool worker
            model.sessions = settings.workers;
            let enhancer = LearnedEnhancer::new(model, settings.pipeline.clone())?;
            info!(status = ?enhancer.warm_up(), "learned enhancer initialised");
            Ok(Box::new(enhancer))
        }
        None => Ok(Box::new(TraditionalPipeline::new(settings.pipeline.clone())?)),
    }
}

fn finish_batch(report: &DatasetReport, report_path: Option<&Path>) -> CliResult<()> {
    println!("{}", report.summary());
    if let Some(path) = report_path {
        report.save_json(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

/// Driver options whose stop signal is raised by Ctrl-C. Images already in
/// flight are still written.
fn interruptible_options(workers: usize) -> DriverOptions {
    let options = DriverOptions::with_workers(workers);
    let stop = options.stop.clone();
    let installed = ctrlc::set_handler(move || {
        warn!("interrupt received, finishing in-flight images");
        stop.stop();
    });
    if let Err(err) = installed {
        warn!(error = %err, "Ctrl-C handler not installed; interrupts abort immediately");
    }
    options
}

fn run_enhance(
    input: &Path,
    output: &Path,
    report: Option<&Path>,
    args: &PipelineArgs,
) -> CliResult<()> {
    let settings = args.resolve()?;
    info!("{}", settings.summary());

    let enhancer = build_enhancer(&settings)?;
    let options = interruptible_options(settings.workers);
    let batch = enhance_dataset(input, output, enhancer.as_ref(), &options)?;
    finish_batch(&batch, report)
}

fn run_enhance_image(input: &Path, output: &Path, args: &PipelineArgs) -> CliResult<()> {
    let settings = args.resolve()?;
    let enhancer = build_enhancer(&settings)?;
    enhance_file(input, output, enhancer.as_ref())?;
    println!("Saved enhanced image to {}", output.display());
    Ok(())
}

fn run_darken(
    input: &Path,
    output: &Path,
    gamma_range: (f32, f32),
    extreme: bool,
    seed: u64,
    workers: Option<usize>,
    report: Option<&Path>,
) -> CliResult<()> {
    let simulator = if extreme {
        LowLightSimulator::new((0.25, 0.25), seed)?
    } else {
        LowLightSimulator::new(gamma_range, seed)?
    };
    let workers = workers.unwrap_or_else(lowlight_core::default_worker_count);

    let options = interruptible_options(workers);
    let batch = enhance_dataset(input, output, &simulator, &options)?;
    finish_batch(&batch, report)
}

fn run_init_config(output: &Path, preset: PresetArg, model: &Path) -> CliResult<()> {
    let settings = match preset {
        PresetArg::Fast => EnhanceSettings::fast_preset(),
        PresetArg::Quality => EnhanceSettings::quality_preset(),
        PresetArg::Learned => EnhanceSettings::learned_preset(model),
    };

    settings.save(output)?;
    println!("Wrote {} to {}", settings.summary(), output.display());
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Enhance {
            input,
            output,
            report,
            pipeline,
        } => run_enhance(&input, &output, report.as_deref(), &pipeline),

        Commands::EnhanceImage {
            input,
            output,
            pipeline,
        } => run_enhance_image(&input, &output, &pipeline),

        Commands::Darken {
            input,
            output,
            gamma_min,
            gamma_max,
            extreme,
            seed,
            workers,
            report,
        } => run_darken(
            &input,
            &output,
            (gamma_min, gamma_max),
            extreme,
            seed,
            workers,
            report.as_deref(),
        ),

        Commands::InitConfig { output, preset, model } => run_init_config(&output, preset, &model),
    }
}

//! Triband offline renderer
//!
//! Usage:
//!   tb-render render in.wav out.wav [--preset p.json] [--block-size N]
//!   tb-render default-preset > p.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tb_core::ParamSnapshot;
use tb_render::{DEFAULT_BLOCK_SIZE, Overrides};

#[derive(Parser)]
#[command(name = "tb-render", about = "Three-band compressor offline renderer")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file
    Render {
        /// Input WAV (16/24/32-bit integer or 32-bit float)
        input: PathBuf,
        /// Output WAV (32-bit float)
        output: PathBuf,
        /// JSON preset; missing fields take their defaults
        #[arg(short, long)]
        preset: Option<PathBuf>,
        /// Frames per processing block
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Leave the low band uncompressed
        #[arg(long)]
        bypass_low: bool,
        /// Leave the mid band uncompressed
        #[arg(long)]
        bypass_mid: bool,
        /// Leave the high band uncompressed
        #[arg(long)]
        bypass_high: bool,
        /// Low/mid crossover (Hz)
        #[arg(long)]
        low_split: Option<f64>,
        /// Mid/high crossover (Hz)
        #[arg(long)]
        high_split: Option<f64>,
        /// Output gain (linear)
        #[arg(long)]
        output_gain: Option<f64>,
    },
    /// Print the default preset as JSON
    DefaultPreset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            input,
            output,
            preset,
            block_size,
            bypass_low,
            bypass_mid,
            bypass_high,
            low_split,
            high_split,
            output_gain,
        } => {
            let overrides = Overrides {
                bypass: [bypass_low, bypass_mid, bypass_high],
                low_split_hz: low_split,
                high_split_hz: high_split,
                output_gain,
            };
            run_render(&input, &output, preset.as_deref(), block_size, &overrides)
        }
        Commands::DefaultPreset => {
            let json = serde_json::to_string_pretty(&ParamSnapshot::default())
                .context("Failed to serialize default preset")?;
            println!("{json}");
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_render(
    input: &Path,
    output: &Path,
    preset: Option<&Path>,
    block_size: usize,
    overrides: &Overrides,
) -> Result<()> {
    let mut params = match preset {
        Some(path) => tb_render::load_preset(path)
            .with_context(|| format!("Failed to load preset {}", path.display()))?,
        None => ParamSnapshot::default(),
    };
    overrides.apply(&mut params);

    let audio = tb_render::read_wav(input).with_context(|| format!("Failed to read {}", input.display()))?;
    log::info!(
        "Input: {} ({} Hz, {} ch, {} frames)",
        input.display(),
        audio.sample_rate,
        audio.channels,
        audio.num_frames()
    );

    let (rendered, report) = tb_render::render(&audio, &params, block_size).context("Render failed")?;

    tb_render::write_wav(output, &rendered).with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!(
        "Wrote {} (peak {:.3} -> {:.3})",
        output.display(),
        report.input_peak,
        report.output_peak
    );
    Ok(())
}

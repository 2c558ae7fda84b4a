//! Command-line interface implementation

mod list;
mod palette;
mod quantize;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::loader::{load_config, merge_cli_overrides, CliOverrides};
use crate::config::MapframeConfig;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Mapframe - quantize images onto map surfaces and manage stored images
#[derive(Parser)]
#[command(name = "mapframe")]
#[command(about = "Mapframe - quantize images onto map surfaces and manage stored images")]
#[command(version)]
pub struct Cli {
    /// Path to mapframe.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dither an image against the map palette and write a PNG preview
    Quantize {
        /// Source image (any format the image crate decodes)
        input: PathBuf,

        /// Output file or directory.
        /// If omitted: {input}_map.png
        /// If directory (ends with /): dir/{input}_map.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Map each pixel to its nearest color without error diffusion
        #[arg(long)]
        nearest: bool,

        /// Resize onto a grid of surfaces, e.g. "2x1"
        #[arg(long)]
        grid: Option<String>,

        /// Scale output by integer factor (1-16, default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,
    },

    /// Print every map palette entry
    Palette {
        /// Only list gray entries
        #[arg(long)]
        grayscale: bool,
    },

    /// List the images stored in a data directory
    List {
        /// Data directory (overrides [storage] dir)
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` wins over both.
fn init_logging(config: &MapframeConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()))
    };
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if let Commands::List { data: Some(ref dir) } = cli.command {
        let overrides = CliOverrides { data_dir: Some(dir.clone()), ..Default::default() };
        merge_cli_overrides(&mut config, &overrides);
    }
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Quantize { input, output, nearest, grid, scale } => {
            quantize::run_quantize(&config, &input, output.as_deref(), nearest, grid.as_deref(), scale)
        }
        Commands::Palette { grayscale } => palette::run_palette(grayscale),
        Commands::List { .. } => list::run_list(&config),
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gifsmith")]
#[command(author, version, about = "Convert short video clips into palette-optimized GIFs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video clip into a GIF
    Convert {
        /// Video file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Output file (defaults to converted-<timestamp>.gif)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quality tier: low, medium or high
        #[arg(short, long)]
        quality: Option<String>,

        /// Start offset in seconds
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,

        /// Clip length in seconds
        #[arg(short, long, allow_negative_numbers = true)]
        duration: Option<f64>,

        /// Requested frame rate (must be positive; the quality tier sets the output rate)
        #[arg(long, allow_negative_numbers = true)]
        fps: Option<f64>,

        /// Print the engine arguments without converting
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Locate or download ffmpeg and report where it was found
    CheckEngine,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cachemux")]
#[command(author, version, about = "Reconstructs playable MP4s from a fragmented m4s cache")]
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
    /// Walk a cache tree and synthesize every eligible asset
    Run {
        /// Cache root to process (overrides config)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Output directory (default: <cache>/output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace existing outputs instead of renaming on collision
        #[arg(long)]
        overwrite: bool,

        /// Skip subtitle retrieval and conversion
        #[arg(long)]
        no_subtitles: bool,

        /// Copy failed pairs into an unmerged folder
        #[arg(long)]
        collect_unmerged: bool,

        /// Open the output folder when the run produced files
        #[arg(long)]
        open: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

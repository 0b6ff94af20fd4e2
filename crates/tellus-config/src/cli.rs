//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tellus command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tellus", about = "Procedural planet renderer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Master noise seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Heightfield rows (polar angle resolution).
    #[arg(long)]
    pub rows: Option<usize>,

    /// Heightfield columns (azimuthal resolution).
    #[arg(long)]
    pub cols: Option<usize>,

    /// Planet nominal radius.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Noise octave count.
    #[arg(long)]
    pub octaves: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Parse from the process arguments.
    pub fn from_env() -> Self {
        Self::parse()
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(width) = args.width {
            self.window.width = width;
        }
        if let Some(height) = args.height {
            self.window.height = height;
        }
        if let Some(seed) = args.seed {
            self.planet.seed = seed;
        }
        if let Some(rows) = args.rows {
            self.planet.rows = rows;
        }
        if let Some(cols) = args.cols {
            self.planet.cols = cols;
        }
        if let Some(radius) = args.radius {
            self.planet.radius = radius;
        }
        if let Some(octaves) = args.octaves {
            self.planet.octaves = octaves;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

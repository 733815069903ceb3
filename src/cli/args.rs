//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// On-device bird classification and detection.
#[derive(Debug, Parser)]
#[command(name = "birdlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config dir).
    #[arg(long, global = true, env = "BIRDLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model cache directory (overrides config).
    #[arg(long, global = true, env = "BIRDLENS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Force CPU inference.
    #[arg(long, global = true)]
    pub cpu: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify the bird species in an image.
    Classify {
        /// Image path or file:// URI.
        image: String,

        /// Number of ranked predictions to show (overrides config).
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u16).range(1..))]
        top_k: Option<u16>,
    },
    /// Detect birds in an image.
    Detect {
        /// Image path or file:// URI.
        image: String,

        /// Minimum detection score (0.0-1.0).
        #[arg(short, long, value_parser = parse_confidence, env = "BIRDLENS_THRESHOLD")]
        threshold: Option<f32>,
    },
    /// Copy models into the cache and create both sessions.
    Warm,
    /// List execution providers and the order they would be tried.
    Providers,
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Parse a score threshold in `[0, 1]`.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "threshold must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

//! Argument definitions for the `imdp` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Supported model file flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelFormat {
    /// PRISM four-file flavor; the model path is the file prefix.
    Prism,
    /// bmdp-tool single text file.
    Bmdp,
    /// Internal JSON model document.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "imdp",
    about = "Robust value iteration over interval Markov decision processes",
    version
)]
pub struct Cli {
    /// Worker threads for the Bellman step ("auto" uses every core).
    #[arg(long, global = true, default_value = "auto")]
    pub threads: String,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Solve a specification on a model and report the value bounds.
    Solve {
        /// Model path (file prefix for the PRISM format).
        model: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: ModelFormat,

        /// JSON specification. Required for bmdp/json models; overrides
        /// the .pctl property of a PRISM model when given.
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Write the JSON solution report to this path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Synthesize a strategy along with the value bounds.
        #[arg(long)]
        synthesize: bool,

        /// Iteration cap for infinite-horizon properties.
        #[arg(long, default_value_t = 100_000)]
        max_iterations: usize,
    },

    /// Print model statistics.
    Inspect {
        model: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: ModelFormat,
    },

    /// Convert a model between file flavors.
    Convert {
        input: PathBuf,

        #[arg(long, value_enum)]
        from: ModelFormat,

        output: PathBuf,

        #[arg(long, value_enum)]
        to: ModelFormat,

        /// Specification to carry along (required when the target is
        /// the PRISM flavor).
        #[arg(long)]
        spec: Option<PathBuf>,
    },
}

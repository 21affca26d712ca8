//! CLI parse: clap types for imprint. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Imprint CLI - content-addressed build decisions for container images
#[derive(Parser)]
#[command(name = "imprint")]
#[command(about = "Decide which container images need rebuilding from their content hash")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide which images need a build and write the manifests
    Plan {
        /// Build-context root (overrides `docker_dir`)
        #[arg(long)]
        docker_dir: Option<PathBuf>,
        /// Registry repository (overrides `repository`)
        #[arg(long)]
        repository: Option<String>,
        /// Skip resolving applications to image tags
        #[arg(long)]
        no_applications: bool,
        /// Print the plan instead of writing manifest files
        #[arg(long)]
        stdout: bool,
        /// Summary format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the content digest of every build context as JSON
    Hashes {
        /// Build-context root (overrides `docker_dir`)
        #[arg(long)]
        docker_dir: Option<PathBuf>,
    },
    /// Hash the files matched by glob patterns
    Hash {
        /// Glob patterns, relative to --base
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Base directory (default: workspace root)
        #[arg(long)]
        base: Option<PathBuf>,
        /// List each hashed file in digest order
        #[arg(long)]
        list: bool,
    },
    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
}

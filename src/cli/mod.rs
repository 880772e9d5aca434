//! CLI command definitions and parsing
use crate::search::SearchMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "poseseek",
    version,
    author = "neur0map",
    about = "Semantic pose search with reranking and adaptive thresholds",
    long_about = "PoseSeek ranks pose catalogue entries against a free-text query using a vector \
                  index, an optional language-model reranker, and adaptive similarity thresholds."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/poseseek/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Profile to apply on top of the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the catalogue
    Search {
        /// Free-text description of the pose
        query: String,

        /// Search mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::MultiStage)]
        mode: ModeArg,

        /// Result count (top-k, final-k or target count depending on mode)
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Minimum similarity for multi-stage and dynamic modes
        #[arg(long)]
        min_similarity: Option<f32>,

        /// Stage-1 recall width for multi-stage mode
        #[arg(long)]
        stage1_k: Option<usize>,

        /// Page number for paginated mode (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Page size for paginated mode
        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Maximum raw distance for paginated mode (smaller is stricter)
        #[arg(long, default_value = "1.5")]
        max_distance: f32,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Embed the catalogue and write the vector index and ID map
    BuildIndex {
        /// Read entries from a JSON file instead of the SQLite catalogue
        #[arg(long, value_name = "FILE")]
        catalogue: Option<PathBuf>,
    },

    /// Show index, ID map and embedder availability
    Status,

    /// Unfiltered nearest-neighbor recall for debugging
    Raw {
        /// Query text
        query: String,

        /// Number of neighbors to recall
        #[arg(short = 'k', long, default_value = "50")]
        k: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Basic,
    MultiStage,
    Dynamic,
    MultiTier,
    Paginated,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ModeArg {
    /// Build the search mode from the shared CLI size flags
    #[allow(clippy::too_many_arguments)]
    pub fn into_mode(
        self,
        top_k: usize,
        min_similarity: Option<f32>,
        stage1_k: Option<usize>,
        page: usize,
        page_size: usize,
        max_distance: f32,
    ) -> SearchMode {
        match self {
            ModeArg::Basic => SearchMode::Basic { top_k },
            ModeArg::MultiStage => SearchMode::MultiStage {
                final_k: top_k,
                stage1_k,
                min_similarity,
            },
            ModeArg::Dynamic => SearchMode::Dynamic {
                target_count: top_k,
                min_similarity,
            },
            ModeArg::MultiTier => SearchMode::MultiTier {
                target_count: top_k,
            },
            ModeArg::Paginated => SearchMode::Paginated {
                page,
                page_size,
                max_distance,
            },
        }
    }
}

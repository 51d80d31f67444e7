use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use vantage::budget::Strategy;
use vantage::cli;
use vantage::config::{SortKey, SortOrder};
use vantage::emit::PackOptions;
use vantage::truncate::TruncateMode;
use vantage::walk::filter::DEFAULT_MAX_FILE_SIZE;

#[derive(Debug, Parser)]
#[command(name = "vantage")]
#[command(about = "Serialize a repository into a single streamable, AI-consumable artifact")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serialize a repository (the default operation)
    Pack {
        /// Repository root (default: current directory)
        root: Option<PathBuf>,
        /// Active lens: architecture, debug, security, onboarding, minimal, or user-defined
        #[arg(long)]
        lens: Option<String>,
        /// Include glob; repeatable, replaces the lens/config include-set
        #[arg(long = "include")]
        include: Vec<String>,
        /// Exclude glob; repeatable, added to the lens/config exclude-set
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Token budget for the whole artifact
        #[arg(long)]
        budget: Option<usize>,
        /// Budget strategy: drop, truncate, hybrid
        #[arg(long, default_value = "hybrid")]
        strategy: Strategy,
        /// Truncation mode override: none, simple, smart, structure
        #[arg(long = "truncate-mode")]
        truncate_mode: Option<TruncateMode>,
        /// Line limit for smart/simple truncation
        #[arg(long = "truncate")]
        truncate_lines: Option<usize>,
        /// Sort key: name, mtime, ctime
        #[arg(long = "sort")]
        sort_by: Option<SortKey>,
        /// Sort order: asc, desc
        #[arg(long = "order")]
        sort_order: Option<SortOrder>,
        /// Drop files below this priority outright
        #[arg(long = "priority-floor", default_value = "0")]
        priority_floor: u8,
        /// Streaming mode: lowest time-to-first-byte, traversal order
        #[arg(long)]
        streaming: bool,
        /// Emit a synthetic meta record first
        #[arg(long)]
        meta: bool,
        /// Maximum file size in bytes
        #[arg(long = "max-file-size", default_value_t = DEFAULT_MAX_FILE_SIZE)]
        max_file_size: u64,
        /// Write the artifact to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List available lenses
    Lenses {
        /// Repository root (for user-defined lenses)
        root: Option<PathBuf>,
    },
    /// Verify the checksums of a framed artifact
    Check {
        /// Artifact file to verify
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Pack {
            root,
            lens,
            include,
            exclude,
            budget,
            strategy,
            truncate_mode,
            truncate_lines,
            sort_by,
            sort_order,
            priority_floor,
            streaming,
            meta,
            max_file_size,
            output,
        } => {
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            let options = PackOptions {
                lens,
                include,
                exclude,
                budget,
                strategy,
                truncate_mode,
                truncate_lines,
                sort_by,
                sort_order,
                priority_floor,
                streaming,
                emit_meta: meta,
                max_file_size,
                store: None,
            };
            cli::run_pack(&root, &options, output.as_deref())
        }
        Commands::Lenses { root } => {
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            cli::run_lenses(&root)
        }
        Commands::Check { file } => {
            if cli::run_check(&file)? {
                Ok(())
            } else {
                std::process::exit(2);
            }
        }
    }
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - pingstore list
//! - pingstore stats
//! - pingstore prune [--max <n>]
//! - pingstore ack <id>...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pingstore - inspect and maintain a ping store directory
#[derive(Parser, Debug)]
#[command(name = "pingstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every stored ping as JSON lines, sorted by ID
    List,

    /// Print record counts and ID bounds
    Stats,

    /// Evict the oldest pings beyond the capacity bound
    Prune {
        /// Capacity bound (overrides the configuration file)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Remove pings confirmed delivered
    Ack {
        /// IDs to remove
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download a file over several connections at once.
///
/// Pump probes the resource, splits it into byte ranges and fetches every
/// range on its own connection, writing each one at its offset in the
/// output file.
#[derive(Parser, Debug)]
#[command(name = "pump")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the file to download
    pub url: String,

    /// Number of chunks (default 8; ignored when --csize is given)
    #[arg(short = 'c', long = "ccount", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_count: Option<u64>,

    /// Chunk size in bytes (wins over --ccount)
    #[arg(short = 's', long = "csize", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Output file path (default: name taken from the URL)
    #[arg(short = 'o', long)]
    pub output_path: Option<PathBuf>,

    /// Extra request header, e.g. -H "Authorization: Bearer xyz" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Keep the derived file name without asking
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Answer yes to every prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Maximum simultaneous connections (1-256; default: one per chunk)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=256))]
    pub max_connections: Option<u64>,

    /// Stop in-flight chunks as soon as one chunk fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Print the job summary as JSON
    #[arg(long)]
    pub json: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

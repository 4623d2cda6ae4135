//! CLI entry point for pump.

use std::io::{self, BufRead, IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pump_core::download::{
    CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, default_output_path, resolve_unique_path,
};
use pump_core::{
    DownloadCoordinator, DownloadRequest, EngineOptions, FailurePolicy, HttpClient, RequestHeaders,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod output;
mod progress_bars;

use app_config::{FileConfig, VerbositySetting};
use cli::Args;
use progress_bars::ChunkBars;

/// The job ran and failed; the partial file is kept.
const EXIT_JOB_FAILED: u8 = 1;
/// The user declined a confirmation prompt.
const EXIT_ABORTED: u8 = 1;
/// Bad arguments, config, headers, or a failed probe.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let file_config = match app_config::load_default_file_config() {
        Ok(loaded) => {
            let config = loaded.config.unwrap_or_default();
            init_tracing(&args, &config);
            debug!(path = ?loaded.path, "config resolved");
            config
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    debug!(?args, "CLI arguments parsed");

    match run(args, file_config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > config file > default (info)
fn init_tracing(args: &Args, config: &FileConfig) {
    let default_level = if args.quiet {
        "error"
    } else {
        match (args.verbose, config.verbosity) {
            (0, None | Some(VerbositySetting::Default)) => "info",
            (0, Some(VerbositySetting::Quiet)) => "error",
            (1, _) | (0, Some(VerbositySetting::Verbose)) => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args, config: FileConfig) -> Result<ExitCode> {
    let quiet = args.quiet || config.verbosity == Some(VerbositySetting::Quiet);
    let assume_yes = args.yes;

    let headers =
        RequestHeaders::parse_lines(&args.headers).context("Invalid --header value")?;

    let client = HttpClient::try_new_with_timeouts(
        args.connect_timeout
            .or(config.connect_timeout_secs)
            .unwrap_or(CONNECT_TIMEOUT_SECS),
        args.read_timeout
            .or(config.read_timeout_secs)
            .unwrap_or(READ_TIMEOUT_SECS),
    )
    .context("Failed to build HTTP client")?;

    let options = engine_options(&args, &config)?;
    let coordinator = DownloadCoordinator::new(Arc::new(client)).with_options(options);

    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(&args.url, Path::new(".")));

    // Command-line chunking replaces the configured chunking as a whole.
    let (chunk_count, chunk_size) = if args.chunk_count.is_some() || args.chunk_size.is_some() {
        (args.chunk_count, args.chunk_size)
    } else {
        (config.chunk_count, config.chunk_size)
    };

    let mut request = DownloadRequest::new(args.url.clone())
        .headers(headers)
        .output_path(&output_path);
    if let Some(count) = chunk_count {
        request = request.chunk_count(count);
    }
    if let Some(size) = chunk_size {
        request = request.chunk_size(size);
    }

    let mut job = coordinator
        .prepare(request)
        .await
        .with_context(|| format!("Cannot download {}", args.url))?;

    if !job.is_parallel() && job.size() > 0 {
        warn!(url = %args.url, "server does not support byte ranges");
        eprintln!("The server does not support parallel download.");
        if !assume_yes && !confirm("Do you want a single threaded download?", true)? {
            info!("download declined");
            eprintln!("Aborted!");
            return Ok(ExitCode::from(EXIT_ABORTED));
        }
    }

    if !quiet {
        eprintln!("Destination: {}", job.output_path().display());
    }
    if !(args.force || assume_yes || args.output_path.is_some())
        && confirm("Do you want to change the file name?", false)?
    {
        let name = ask_line("New file name: ")?;
        if !name.is_empty() {
            let dir = job
                .output_path()
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            job = job.with_output_path(resolve_unique_path(&dir, &name));
            if !quiet {
                eprintln!("Destination: {}", job.output_path().display());
            }
        }
    }

    if !quiet {
        eprintln!("{}", output::fetching_line(job.size(), job.chunks().len()));
    }

    let bars = (!(quiet || args.no_progress || args.json))
        .then(|| Arc::new(ChunkBars::new(job.chunks(), options.read_unit_size)));
    let coordinator = match &bars {
        Some(bars) => coordinator.with_progress(bars.clone()),
        None => coordinator,
    };

    let outcome = coordinator.run(&job).await;
    if let Some(bars) = &bars {
        bars.clear();
    }

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::from(EXIT_JOB_FAILED));
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result.summary())
            .context("Failed to serialize job summary")?;
        println!("{json}");
    } else if !result.is_success() {
        eprintln!("{}", output::render_result(&result));
    } else if !quiet {
        println!("{}", output::render_result(&result));
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_JOB_FAILED)
    })
}

fn engine_options(args: &Args, config: &FileConfig) -> Result<EngineOptions> {
    let max_connections = args
        .max_connections
        .or(config.max_connections)
        .map(|n| {
            usize::try_from(n)
                .ok()
                .and_then(NonZeroUsize::new)
                .context("max_connections must be between 1 and 256")
        })
        .transpose()?;
    let failure_policy = if args.fail_fast || config.fail_fast.unwrap_or(false) {
        FailurePolicy::CancelInFlight
    } else {
        FailurePolicy::Drain
    };
    Ok(EngineOptions {
        max_connections,
        failure_policy,
        ..EngineOptions::default()
    })
}

/// Asks a yes/no question on stderr. Without a terminal on stdin, answers
/// `default`.
fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = ask_line(&format!("{question} {hint} "))?;
    Ok(parse_answer(&answer, default))
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

fn ask_line(prompt: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        return Ok(String::new());
    }
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

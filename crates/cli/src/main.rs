//! perfgate CLI: drains and maintains the trace buffer.
//!
//! - `perfgate sync`   submit buffered traces in chunks, deleting what was accepted
//! - `perfgate clear`  delete every buffered trace
//! - `perfgate status` show the sending mode and backlog
//!
//! Exactly one `sync` must run per buffer at a time. Schedule it with a
//! single-instance lock, or run `sync --interval` as the only drainer.

mod commands;
mod format;
mod parse;

use std::path::Path;
use std::process;
use std::thread;
use std::time::Duration;

use clap::parser::ValueSource;
use perfgate_buffer::{BufferBackend, TraceBuffer};
use perfgate_core::Config;
use perfgate_delivery::{DrainEngine, DrainReport, HttpSender, DEFAULT_CHUNK_SIZE};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_chunk, format_cleared, format_error, format_report, format_status, OutputMode};
use parse::{matches_to_action, CliAction};

const NO_STRATEGY: &str = "No buffering strategy configured.";

fn main() {
    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    init_logging(matches.get_flag("verbose"));

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    let exit_code = match matches_to_action(&matches) {
        Ok(action) => run(action, &config, output_mode),
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PERFGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &clap::ArgMatches) -> Result<Config, String> {
    let path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("perfgate.toml");
    let implicit = matches.value_source("config") == Some(ValueSource::DefaultValue);

    let config = if implicit && !Path::new(path).exists() {
        Config::default()
    } else {
        Config::load(path).map_err(|e| format!("Failed to load {}: {}", path, e))?
    };
    let config = config
        .with_env_overrides()
        .map_err(|e| format!("Invalid environment override: {}", e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn run(action: CliAction, config: &Config, mode: OutputMode) -> i32 {
    match action {
        CliAction::Sync {
            chunk_size,
            interval,
        } => run_sync(config, chunk_size, interval, mode),
        CliAction::Clear => run_clear(config, mode),
        CliAction::Status => run_status(config, mode),
    }
}

fn open_buffer(config: &Config, mode: OutputMode) -> Result<BufferBackend, i32> {
    match BufferBackend::from_config(config) {
        Ok(Some(buffer)) => Ok(buffer),
        Ok(None) => {
            eprintln!("{}", format_error(NO_STRATEGY, mode));
            Err(1)
        }
        Err(e) => {
            eprintln!("{}", format_error(&format!("Failed to open buffer: {}", e), mode));
            Err(1)
        }
    }
}

fn run_sync(
    config: &Config,
    chunk_size: Option<usize>,
    interval: Option<Duration>,
    mode: OutputMode,
) -> i32 {
    let buffer = match open_buffer(config, mode) {
        Ok(b) => b,
        Err(code) => return code,
    };
    let engine = match DrainEngine::new(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            return 1;
        }
    };

    match interval {
        None => sync_once(config, &buffer, &engine, mode),
        Some(every) => loop {
            if sync_once(config, &buffer, &engine, mode) != 0 {
                tracing::warn!(retry_in = ?every, "drain pass did not complete");
            }
            thread::sleep(every);
        },
    }
}

fn sync_once(config: &Config, buffer: &BufferBackend, engine: &DrainEngine, mode: OutputMode) -> i32 {
    let pending = match buffer.count_unsent() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            return 1;
        }
    };
    if pending == 0 {
        println!("{}", format_report(&DrainReport::default(), mode));
        return 0;
    }
    if mode == OutputMode::Human {
        println!("Found {} unsent traces, syncing...", pending);
    }

    let sender = match HttpSender::from_config(config) {
        Ok(sender) => sender,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            return 1;
        }
    };

    let result = engine.drain_with_progress(buffer, &sender, |chunk| {
        if mode == OutputMode::Human {
            println!("{}", format_chunk(chunk));
        }
    });
    match result {
        Ok(report) if report.is_complete() => {
            println!("{}", format_report(&report, mode));
            0
        }
        Ok(report) => {
            eprintln!("{}", format_report(&report, mode));
            1
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            1
        }
    }
}

fn run_clear(config: &Config, mode: OutputMode) -> i32 {
    let buffer = match open_buffer(config, mode) {
        Ok(b) => b,
        Err(code) => return code,
    };
    match buffer.clear() {
        Ok(()) => {
            println!("{}", format_cleared(mode));
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            1
        }
    }
}

fn run_status(config: &Config, mode: OutputMode) -> i32 {
    let unsent = match BufferBackend::from_config(config) {
        Ok(None) => None,
        Ok(Some(buffer)) => match buffer.count_unsent() {
            Ok(n) => Some(n),
            Err(e) => {
                eprintln!("{}", format_error(&e.to_string(), mode));
                return 1;
            }
        },
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), mode));
            return 1;
        }
    };
    println!("{}", format_status(config.sending.mode, unsent, mode));
    0
}

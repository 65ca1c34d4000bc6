//! ArgMatches to CliAction conversion.

use clap::ArgMatches;
use std::time::Duration;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// One drain pass, or repeated passes when `interval` is set.
    Sync {
        chunk_size: Option<usize>,
        interval: Option<Duration>,
    },
    /// Empty the buffer.
    Clear,
    /// Report mode and backlog.
    Status,
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "sync" => parse_sync(sub_matches),
        "clear" => Ok(CliAction::Clear),
        "status" => Ok(CliAction::Status),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_sync(m: &ArgMatches) -> Result<CliAction, String> {
    let chunk_size = m
        .get_one::<String>("chunk-size")
        .map(|s| s.parse::<usize>())
        .transpose()
        .map_err(|e| format!("Invalid chunk size: {}", e))?;
    if chunk_size == Some(0) {
        return Err("Invalid chunk size: must be at least 1".to_string());
    }
    let interval = m
        .get_one::<String>("interval")
        .map(|s| s.parse::<u64>())
        .transpose()
        .map_err(|e| format!("Invalid interval: {}", e))?;
    if interval == Some(0) {
        return Err("Invalid interval: must be at least 1 second".to_string());
    }
    let interval = interval.map(Duration::from_secs);
    Ok(CliAction::Sync {
        chunk_size,
        interval,
    })
}

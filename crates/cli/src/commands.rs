//! Command-line definition.

use clap::{Arg, ArgAction, Command};

/// Build the `perfgate` command tree.
pub fn build_cli() -> Command {
    Command::new("perfgate")
        .about("Drain and maintain perfgate trace buffers")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("PATH")
                .default_value("perfgate.toml")
                .help("Configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .subcommand(
            Command::new("sync")
                .about("Submit buffered traces and remove them from the buffer")
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .value_name("N")
                        .help("Records per chunk (default 100)"),
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .value_name("SECS")
                        .help("Keep running, starting a new pass every SECS seconds"),
                ),
        )
        .subcommand(Command::new("clear").about("Delete every buffered trace"))
        .subcommand(Command::new("status").about("Show sending mode and unsent trace count"))
}

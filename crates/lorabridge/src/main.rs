mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use tracing::debug;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

/// Host side of the ESP32 LoRa bridge: watch a serial link, send packets,
/// and encode or decode frames offline.
#[derive(Parser, Debug)]
#[command(
    name = "lorabridge",
    version,
    about = "ESP32 LoRa bridge serial CLI",
    propagate_version = true
)]
struct Cli {
    /// Output format. A terminal gets a table, anything else JSON lines.
    #[arg(
        long,
        short = 'o',
        value_name = "FORMAT",
        env = "LORABRIDGE_FORMAT",
        global = true
    )]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "LORABRIDGE_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr). The session log lines are emitted at info.
    #[arg(
        long,
        value_name = "LEVEL",
        env = "LORABRIDGE_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);
    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);

    let code = match cmd::run(cli.command, format) {
        Ok(code) => code,
        Err(err) => {
            debug!(code = err.code, "command failed");
            eprintln!("lorabridge: {err}");
            err.code
        }
    };
    std::process::exit(code);
}

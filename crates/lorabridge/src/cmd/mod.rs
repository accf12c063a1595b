use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use lorabridge_frame::{hex_to_bytes, ExtractionPolicy};
use lorabridge_session::CANNED_PAYLOAD;
use lorabridge_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a session against a device and print received messages.
    Monitor(MonitorArgs),
    /// Write a single packet to a device.
    Send(SendArgs),
    /// Encode a packet and print it.
    Encode(EncodeArgs),
    /// Extract and parse messages from hex text.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum PolicyArg {
    /// First header to last footer, markers stripped anywhere.
    #[default]
    Compatible,
    /// Byte-aligned, length-directed frames.
    Hardened,
}

impl From<PolicyArg> for ExtractionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Compatible => ExtractionPolicy::Compatible,
            PolicyArg::Hardened => ExtractionPolicy::Hardened,
        }
    }
}

#[derive(Args, Debug)]
pub struct PacketArgs {
    /// Message type byte (decimal or 0x-prefixed hex).
    #[arg(
        long = "type",
        value_name = "TYPE",
        default_value = "1",
        value_parser = parse_type
    )]
    pub msg_type: u8,
    /// Text payload. Without --data or --hex the canned `on` command is used.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Payload given as hex digits.
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
}

impl PacketArgs {
    pub fn payload(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return hex_to_bytes(hex.trim()).map_err(|err| {
                CliError::new(USAGE, format!("--hex is not valid hex: {err}"))
            });
        }
        Ok(CANNED_PAYLOAD.to_vec())
    }
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device or unix socket path.
    #[arg(env = "LORABRIDGE_DEVICE")]
    pub path: PathBuf,
    /// Baud rate applied to terminal devices.
    #[arg(long, env = "LORABRIDGE_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Consumer tick (e.g. 50ms, 1s).
    #[arg(long, env = "LORABRIDGE_TICK", default_value = "50ms")]
    pub tick: String,
    /// Timeout of each blocking read.
    #[arg(long, env = "LORABRIDGE_READ_TIMEOUT", default_value = "1s")]
    pub read_timeout: String,
    /// Frame extraction policy.
    #[arg(long, value_enum, default_value_t = PolicyArg::Compatible)]
    pub policy: PolicyArg,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop after this long (e.g. 30s). With --count, falling short exits 124.
    #[arg(long, env = "LORABRIDGE_DURATION")]
    pub duration: Option<String>,
    /// Feed the built-in test frame through the session at start.
    #[arg(long)]
    pub inject_test: bool,
    /// Send the canned `on` command at start.
    #[arg(long)]
    pub send_canned: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub packet: PacketArgs,
    /// Write timeout (e.g. 1s, 500ms).
    #[arg(long, env = "LORABRIDGE_WRITE_TIMEOUT", default_value = "1s")]
    pub write_timeout: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub packet: PacketArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex text, fed to the extractor one argument at a time.
    #[arg(required = true)]
    pub chunks: Vec<String>,
    /// Frame extraction policy.
    #[arg(long, value_enum, default_value_t = PolicyArg::Compatible)]
    pub policy: PolicyArg,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_type(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| {
        format!("invalid message type: {input} (expected 0-255 or 0x00-0xFF)")
    })
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number.parse().map_err(|_| {
        CliError::new(USAGE, format!("invalid duration value: {input}"))
    })?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_type_decimal_and_hex() {
        assert_eq!(parse_type("2"), Ok(2));
        assert_eq!(parse_type("0x7F"), Ok(0x7F));
        assert_eq!(parse_type("0XfF"), Ok(0xFF));
        assert!(parse_type("256").is_err());
        assert!(parse_type("0xZZ").is_err());
    }

    #[test]
    fn payload_defaults_to_canned_command() {
        let args = PacketArgs {
            msg_type: 1,
            data: None,
            hex: None,
        };
        assert_eq!(args.payload().unwrap(), b"on".to_vec());
    }

    #[test]
    fn payload_from_hex() {
        let args = PacketArgs {
            msg_type: 2,
            data: None,
            hex: Some("4C45".to_string()),
        };
        assert_eq!(args.payload().unwrap(), vec![0x4C, 0x45]);

        let bad = PacketArgs {
            msg_type: 2,
            data: None,
            hex: Some("4C4".to_string()),
        };
        assert_eq!(bad.payload().unwrap_err().code, USAGE);
    }
}

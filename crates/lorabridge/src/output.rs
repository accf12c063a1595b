use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lorabridge_frame::{bytes_to_hex, Message, FRAME_OVERHEAD};
use lorabridge_session::format_message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    msg_type: u8,
    declared_length: u8,
    payload_hex: String,
    payload_ascii: String,
    received_checksum: String,
    calculated_checksum: String,
    checksum_valid: bool,
    timestamp: String,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: message.kind().label(),
                msg_type: message.msg_type(),
                declared_length: message.declared_length(),
                payload_hex: message.payload_hex(),
                payload_ascii: message.payload_ascii(),
                received_checksum: format!("{:02X}", message.received_checksum()),
                calculated_checksum: format!("{:02X}", message.calculated_checksum()),
                checksum_valid: message.is_checksum_valid(),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "LEN", "PAYLOAD", "ASCII", "CHECKSUM", "VALID"])
                .add_row(vec![
                    format!("{} (0x{:02X})", message.kind().label(), message.msg_type()),
                    message.declared_length().to_string(),
                    message.payload_hex(),
                    printable(&message.payload_ascii()),
                    format!("{:02X}", message.received_checksum()),
                    message.is_checksum_valid().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", format_message(message));
        }
        OutputFormat::Raw => {
            print_raw(message.payload());
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    msg_type: u8,
    declared_length: usize,
    checksum: String,
    frame_hex: String,
}

/// Print an encoded outbound packet.
pub fn print_packet(packet: &[u8], format: OutputFormat) {
    // header, type, length, payload.., checksum, footer
    let msg_type = packet.get(1).copied().unwrap_or_default();
    let declared_length = packet.len().saturating_sub(FRAME_OVERHEAD);
    let checksum = packet
        .len()
        .checked_sub(2)
        .and_then(|i| packet.get(i))
        .copied()
        .unwrap_or_default();

    match format {
        OutputFormat::Json => {
            print_json(&PacketOutput {
                msg_type,
                declared_length,
                checksum: format!("{checksum:02X}"),
                frame_hex: bytes_to_hex(packet),
            });
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "LEN", "CHECKSUM", "FRAME"])
                .add_row(vec![
                    format!("0x{msg_type:02X}"),
                    declared_length.to_string(),
                    format!("{checksum:02X}"),
                    bytes_to_hex(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", bytes_to_hex(packet));
        }
        OutputFormat::Raw => {
            print_raw(packet);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Replace control characters so table cells stay on one line.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '.' } else { c })
        .collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_masks_control_characters() {
        assert_eq!(printable("on\r\n"), "on..");
        assert_eq!(printable("LED is on"), "LED is on");
    }
}

use lorabridge_frame::{bytes_to_spaced_hex, packet_bytes};
use lorabridge_transport::TransportConfig;
use tracing::{info, warn};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let write_timeout = parse_duration(&args.write_timeout)?;
    let payload = args.packet.payload()?;
    let packet = packet_bytes(args.packet.msg_type, &payload)
        .map_err(|err| frame_error("encode failed", err))?;

    let config = TransportConfig::new(&args.link.path).with_baud_rate(args.link.baud);
    let mut transport = lorabridge_transport::open(&config).map_err(|err| {
        let context = format!("failed to open {}", args.link.path.display());
        transport_error(&context, err)
    })?;

    transport
        .write(&packet, write_timeout)
        .map_err(|err| transport_error("send failed", err))?;
    info!(packet = %bytes_to_spaced_hex(&packet), "packet sent");

    if let Err(err) = transport.close() {
        warn!(error = %err, "error closing serial port");
    }

    print_packet(&packet, format);
    Ok(SUCCESS)
}

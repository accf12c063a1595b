use lorabridge_frame::packet_bytes;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.packet.payload()?;
    let packet = packet_bytes(args.packet.msg_type, &payload)
        .map_err(|err| frame_error("encode failed", err))?;
    print_packet(&packet, format);
    Ok(SUCCESS)
}

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("lorabridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: lorabridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("LORABRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "protocol: header=0x{:02X} footer=0x{:02X} max_payload={}",
        lorabridge_frame::HEADER_BYTE,
        lorabridge_frame::FOOTER_BYTE,
        lorabridge_frame::MAX_PAYLOAD
    );
    println!("default_baud: {}", lorabridge_transport::DEFAULT_BAUD_RATE);

    Ok(SUCCESS)
}

use lorabridge_frame::{Extraction, FrameExtractor};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Exit code is `DATA_INVALID` when any candidate was rejected.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut extractor = FrameExtractor::with_policy(args.policy.into());
    let mut rejected = 0usize;

    for chunk in &args.chunks {
        for extraction in extractor.ingest(chunk.trim()) {
            match extraction {
                Extraction::Message { message, .. } => print_message(&message, format),
                // The extractor already logs the candidate and the reason.
                Extraction::Rejected { .. } => rejected += 1,
            }
        }
    }

    if extractor.pending_len() > 0 {
        debug!(
            pending = %String::from_utf8_lossy(extractor.pending()),
            "hex left without a complete frame"
        );
    }

    if rejected > 0 {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

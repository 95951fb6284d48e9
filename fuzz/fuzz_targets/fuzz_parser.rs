#![no_main]

use jsonpush::{ErrorAction, ErrorCode, ParseContext, PushParser};
use libfuzzer_sys::fuzz_target;

// First two bytes steer the harness: chunk size and error policy. The rest
// is fed to the parser, which must terminate without panicking whatever the
// input, the chunking, or the recovery policy.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let chunk_size = usize::from(data[0]).max(1);
    let tolerant = data[1] & 1 == 1;
    let body = &data[2..];

    let mut parser = PushParser::new();
    let mut failed = false;
    for chunk in body.chunks(chunk_size) {
        if parser.parse(chunk).is_err() {
            failed = true;
            break;
        }
    }
    if !failed {
        let _ = parser.finish();
    }

    if tolerant {
        let policy = |_code: ErrorCode, _ctx: &ParseContext| ErrorAction::Continue;
        let mut parser = PushParser::with_sink_and_handler(jsonpush::NullSink, policy);
        let mut failed = false;
        for chunk in body.chunks(chunk_size) {
            if parser.parse(chunk).is_err() {
                failed = true;
                break;
            }
        }
        if !failed {
            let _ = parser.finish();
        }
    }
});

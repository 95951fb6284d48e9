//! Reads JSON from stdin and reports whether it is well formed, with the
//! location of the first problem.
//!
//! ```sh
//! echo '{"ok": true}' | cargo run --example validate
//! ```

use std::io::Read;
use std::process::ExitCode;

use jsonpush::PushParser;

fn main() -> ExitCode {
    let mut input = Vec::new();
    if let Err(err) = std::io::stdin().read_to_end(&mut input) {
        eprintln!("error reading stdin: {err}");
        return ExitCode::FAILURE;
    }

    let mut parser = PushParser::new();
    let result = parser.parse(&input).and_then(|consumed| {
        parser.finish()?;
        parser.check_done(&input[consumed..])
    });

    match result {
        Ok(()) => {
            println!("valid JSON");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

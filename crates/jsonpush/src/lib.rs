//! An incremental, push-style JSON parser.
//!
//! Feed byte chunks of any size into a [`PushParser`] and receive structural
//! events (`begin_document`, containers, member names, scalar values,
//! `end_document`) on a [`JsonEventSink`] the moment they complete. The
//! parser never materializes a document tree and the emitted event sequence
//! is independent of how the input was chunked.
//!
//! Every recoverable anomaly is routed through a [`ParseErrorHandler`], the
//! only policy surface: the default [`StrictErrorHandler`] stops at the
//! first problem, while a custom handler can pick the documented recovery
//! per [`ErrorCode`] and keep going.
//!
//! ```rust
//! use jsonpush::PushParser;
//!
//! let mut parser = PushParser::new();
//! parser.parse(br#"{"a": 1, "b": [true, null, -2.5e1]}"#)?;
//! parser.finish()?;
//! assert!(parser.done());
//! # Ok::<(), jsonpush::ParseError>(())
//! ```

#![no_std]
#![allow(missing_docs)]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod codepoint;
mod error;
mod number;
mod parser;
mod sink;
mod utf8;

pub use error::{ErrorAction, ErrorCode, ParseError, ParseErrorHandler, StrictErrorHandler};
pub use parser::{ParseState, PushParser};
pub use sink::{JsonEventSink, NullSink, ParseContext};

#[cfg(test)]
mod tests;

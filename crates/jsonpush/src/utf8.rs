//! UTF-8 validation of verbatim string runs, with classified failures.
//!
//! String bytes copied verbatim from the input must be well-formed UTF-8.
//! `core::str::from_utf8` does the validation; this module classifies a
//! failure so the parser can report the precise anomaly (over-long
//! sequence, missing continuation byte, surrogate encoded in UTF-8, value
//! above U+10FFFF) instead of a generic "bad UTF-8".
//!
//! An *incomplete* trailing sequence is not classified as an error here:
//! it may be a multi-byte character split across two input chunks, which
//! the parser stitches back together.

/// Classified reason a byte run is not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Utf8ErrorKind {
    /// A longer encoding than the codepoint requires, e.g. `C0 80`.
    OverLong,
    /// A lead byte not followed by enough continuation bytes.
    ExpectedContinuationByte,
    /// A high surrogate (U+D800..U+DBFF) encoded directly in UTF-8.
    UnpairedHighSurrogate,
    /// A low surrogate (U+DC00..U+DFFF) encoded directly in UTF-8.
    IllegalSurrogate,
    /// Anything else: stray continuation byte, value above U+10FFFF, `F5..FF`.
    IllegalCodepoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Utf8Error {
    pub kind: Utf8ErrorKind,
    /// Length of the valid prefix, in bytes.
    pub valid_up_to: usize,
    /// Length of the offending sequence, or `None` if the run merely ends
    /// with the incomplete prefix of a possibly-valid character.
    pub error_len: Option<usize>,
}

/// Validates a verbatim run.
pub(crate) fn validate(bytes: &[u8]) -> Result<&str, Utf8Error> {
    match core::str::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let valid_up_to = e.valid_up_to();
            let kind = classify(&bytes[valid_up_to..]);
            Err(Utf8Error {
                kind,
                valid_up_to,
                error_len: e.error_len(),
            })
        }
    }
}

/// Number of bytes the sequence led by `lead` occupies, for reassembling a
/// character split across chunk boundaries.
pub(crate) fn sequence_len(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

pub(crate) fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Buffer for a multi-byte character split across chunk boundaries.
///
/// Holds the incomplete tail bytes of the previous chunk (lead byte first)
/// until the continuation bytes arrive in a later chunk.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PendingSequence {
    buf: [u8; 4],
    len: u8,
    need: u8,
}

impl PendingSequence {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.need = 0;
    }

    /// Stashes the incomplete tail of a run (one to three bytes, lead first).
    pub fn start(&mut self, tail: &[u8]) {
        let n = tail.len().min(4);
        self.buf[..n].copy_from_slice(&tail[..n]);
        self.len = n as u8;
        self.need = sequence_len(tail[0]) as u8;
    }

    /// Adds one continuation byte; true once the sequence is complete.
    pub fn push(&mut self, byte: u8) -> bool {
        if usize::from(self.len) < 4 {
            self.buf[usize::from(self.len)] = byte;
            self.len += 1;
        }
        self.len >= self.need
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..usize::from(self.len)]
    }
}

fn classify(rest: &[u8]) -> Utf8ErrorKind {
    let lead = rest[0];
    let next = rest.get(1).copied();
    match lead {
        0x80..=0xBF | 0xF5..=0xFF => Utf8ErrorKind::IllegalCodepoint,
        0xC0 | 0xC1 => Utf8ErrorKind::OverLong,
        0xE0 if matches!(next, Some(0x80..=0x9F)) => Utf8ErrorKind::OverLong,
        0xF0 if matches!(next, Some(0x80..=0x8F)) => Utf8ErrorKind::OverLong,
        0xED if matches!(next, Some(0xA0..=0xAF)) => Utf8ErrorKind::UnpairedHighSurrogate,
        0xED if matches!(next, Some(0xB0..=0xBF)) => Utf8ErrorKind::IllegalSurrogate,
        0xF4 if matches!(next, Some(0x90..=0xBF)) => Utf8ErrorKind::IllegalCodepoint,
        _ => Utf8ErrorKind::ExpectedContinuationByte,
    }
}

//! The push-style incremental JSON parser.
//!
//! [`PushParser`] consumes JSON text in arbitrarily sliced byte chunks and
//! delivers structural events to a [`JsonEventSink`] as soon as they are
//! recognized. No tree is materialized; the parser is the lexing and
//! validation engine that DOM builders, validators and transcoders compose
//! with.
//!
//! Chunk boundaries may fall anywhere, including in the middle of a string
//! escape, a keyword, a number, or a multi-byte UTF-8 character. When a
//! chunk runs out the parser saves its exact position in the token and the
//! next [`parse`](PushParser::parse) call resumes there.
//!
//! # Examples
//!
//! Validating without collecting anything:
//!
//! ```rust
//! use jsonpush::PushParser;
//!
//! let mut parser = PushParser::new();
//! parser.parse(br#"{"key": [null, true, 3.14]}"#)?;
//! parser.finish()?;
//! assert!(parser.done());
//! # Ok::<(), jsonpush::ParseError>(())
//! ```
//!
//! Feeding a document in chunks:
//!
//! ```rust
//! use jsonpush::PushParser;
//!
//! let mut parser = PushParser::new();
//! for chunk in [&br#"{"he"#[..], &br#"llo": "wo"#[..], &br#"rld"}"#[..]] {
//!     parser.parse(chunk)?;
//! }
//! parser.finish()?;
//! # Ok::<(), jsonpush::ParseError>(())
//! ```

use alloc::{string::String, vec::Vec};
use core::mem;

use crate::{
    codepoint::{self, CodepointAssembler},
    error::{ErrorAction, ErrorCode, ParseError, ParseErrorHandler, StrictErrorHandler},
    number,
    sink::{JsonEventSink, NullSink, ParseContext},
    utf8::{self, PendingSequence, Utf8ErrorKind},
};

const INITIAL_STACK_CAPACITY: usize = 16;

/// The parser's current position in the JSON grammar.
///
/// `Root`, `Object`, `Array` and `MemberName` never drive the loop; they
/// live on the state stack to record the enclosing context. `Cr` and `Lf`
/// are transient line-terminator states, the `Escape*` family tracks escape
/// sequences inside strings, and the single-letter states are the slow path
/// for keywords truncated by a chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Root,
    Start,
    Slash,
    SlashSlash,
    SlashStar,
    SlashStarStar,
    ExpectCommaOrEnd,
    Object,
    ExpectMemberNameOrEnd,
    ExpectMemberName,
    ExpectColon,
    ExpectValueOrEnd,
    ExpectValue,
    Array,
    StringU1,
    MemberName,
    Escape,
    EscapeU1,
    EscapeU2,
    EscapeU3,
    EscapeU4,
    EscapeExpectSurrogatePair1,
    EscapeExpectSurrogatePair2,
    EscapeU6,
    EscapeU7,
    EscapeU8,
    EscapeU9,
    Minus,
    Zero,
    Integer,
    Fraction1,
    Fraction2,
    Exp1,
    Exp2,
    Exp3,
    N,
    Nu,
    Nul,
    T,
    Tr,
    Tru,
    F,
    Fa,
    Fal,
    Fals,
    Cr,
    Lf,
    Done,
}

#[derive(Debug, Clone, Copy)]
enum Keyword {
    Null,
    True,
    False,
}

/// Read-only window over the chunk passed to [`PushParser::parse`].
struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }
}

/// Incremental push parser over byte chunks.
///
/// Constructed once and optionally [`reset`](Self::reset) for reuse. The
/// sink and error handler are owned by the parser; retrieve results with
/// [`sink`](Self::sink), [`sink_mut`](Self::sink_mut) or
/// [`into_sink`](Self::into_sink).
pub struct PushParser<S = NullSink, H = StrictErrorHandler> {
    sink: S,
    err_handler: H,
    ctx: ParseContext,
    state: ParseState,
    state_stack: Vec<ParseState>,
    string_buffer: String,
    is_negative: bool,
    precision: u8,
    codepoint: CodepointAssembler,
    pending_utf8: PendingSequence,
    nesting_depth: usize,
    max_depth: usize,
    document_started: bool,
    exhausted: bool,
}

impl PushParser<NullSink, StrictErrorHandler> {
    /// A parser that only validates: events are discarded and the first
    /// anomaly stops the parse.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink_and_handler(NullSink, StrictErrorHandler)
    }
}

impl Default for PushParser<NullSink, StrictErrorHandler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: JsonEventSink> PushParser<S, StrictErrorHandler> {
    #[must_use]
    pub fn with_sink(sink: S) -> Self {
        Self::with_sink_and_handler(sink, StrictErrorHandler)
    }
}

impl<S: JsonEventSink, H: ParseErrorHandler> PushParser<S, H> {
    #[must_use]
    pub fn with_sink_and_handler(sink: S, err_handler: H) -> Self {
        let mut state_stack = Vec::with_capacity(INITIAL_STACK_CAPACITY);
        state_stack.push(ParseState::Root);
        Self {
            sink,
            err_handler,
            ctx: ParseContext::new(),
            state: ParseState::Start,
            state_stack,
            string_buffer: String::new(),
            is_negative: false,
            precision: 0,
            codepoint: CodepointAssembler::new(),
            pending_utf8: PendingSequence::default(),
            nesting_depth: 0,
            max_depth: usize::MAX,
            document_started: false,
            exhausted: true,
        }
    }

    /// Consumes the next input chunk, emitting events as tokens complete.
    ///
    /// Returns the number of bytes consumed. This equals `chunk.len()`
    /// unless the document terminated inside the chunk, in which case any
    /// whitespace directly after the document is consumed too and the rest
    /// is left for [`check_done`](Self::check_done).
    ///
    /// An `Err` means the error handler stopped the parse (or a fatal
    /// structural imbalance occurred). The parser keeps its state; call
    /// [`reset`](Self::reset) to start over with the same collaborators.
    pub fn parse(&mut self, chunk: &[u8]) -> Result<usize, ParseError> {
        let mut cur = Cursor {
            input: chunk,
            pos: 0,
        };
        let result = self.run(&mut cur);
        if result.is_ok() && self.state == ParseState::Done {
            self.skip_trailing_filler(&mut cur);
        }
        self.exhausted = cur.is_empty();
        match result {
            Ok(()) => Ok(cur.pos),
            Err(code) => Err(ParseError::new(code, &self.ctx)),
        }
    }

    /// Declares the end of input.
    ///
    /// A number still open at the top level is terminated and emitted, a
    /// transient line-terminator state is unwound, and any other resting
    /// state except `done` (or an untouched `start`) raises
    /// [`ErrorCode::UnexpectedEof`].
    pub fn finish(&mut self) -> Result<(), ParseError> {
        self.end_parse()
            .map_err(|code| ParseError::new(code, &self.ctx))
    }

    /// Scans input left over after the document terminated.
    ///
    /// Whitespace and line breaks are consumed (updating the location
    /// counters); anything else raises [`ErrorCode::ExtraCharacter`].
    pub fn check_done(&mut self, rest: &[u8]) -> Result<(), ParseError> {
        self.check_done_inner(rest)
            .map_err(|code| ParseError::new(code, &self.ctx))
    }

    /// Reinitializes the parser for a new document, keeping the sink, the
    /// error handler and the configured depth limit.
    pub fn reset(&mut self) {
        self.state_stack.clear();
        self.state_stack.push(ParseState::Root);
        self.state = ParseState::Start;
        self.ctx.reset();
        self.string_buffer.clear();
        self.is_negative = false;
        self.precision = 0;
        self.codepoint.reset();
        self.pending_utf8.clear();
        self.nesting_depth = 0;
        self.document_started = false;
        self.exhausted = true;
    }

    #[must_use]
    pub fn state(&self) -> ParseState {
        self.state
    }

    #[must_use]
    pub fn done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Whether the previous [`parse`](Self::parse) call consumed its whole
    /// chunk.
    #[must_use]
    pub fn source_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn line_number(&self) -> usize {
        self.ctx.line()
    }

    #[must_use]
    pub fn column_number(&self) -> usize {
        self.ctx.column()
    }

    #[must_use]
    pub fn max_nesting_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_nesting_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    #[must_use]
    pub fn error_handler(&self) -> &H {
        &self.err_handler
    }

    pub fn error_handler_mut(&mut self) -> &mut H {
        &mut self.err_handler
    }

    // --------------------------------------------------------------------
    // Driver loop
    // --------------------------------------------------------------------

    fn run(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        loop {
            match self.state {
                ParseState::Done => return Ok(()),
                ParseState::Lf => {
                    self.state = self.pop_state();
                    continue;
                }
                _ => {}
            }
            if cur.is_empty() {
                return Ok(());
            }
            match self.state {
                ParseState::Cr => {
                    if cur.peek() == Some(b'\n') {
                        cur.pos += 1;
                    }
                    self.state = self.pop_state();
                }
                ParseState::Start => self.on_start(cur)?,
                ParseState::ExpectCommaOrEnd => self.on_expect_comma_or_end(cur)?,
                ParseState::ExpectMemberNameOrEnd => self.on_expect_member_name_or_end(cur)?,
                ParseState::ExpectMemberName => self.on_expect_member_name(cur)?,
                ParseState::ExpectColon => self.on_expect_colon(cur)?,
                ParseState::ExpectValue => self.on_expect_value(cur)?,
                ParseState::ExpectValueOrEnd => self.on_expect_value_or_end(cur)?,
                ParseState::StringU1
                | ParseState::Escape
                | ParseState::EscapeU1
                | ParseState::EscapeU2
                | ParseState::EscapeU3
                | ParseState::EscapeU4
                | ParseState::EscapeExpectSurrogatePair1
                | ParseState::EscapeExpectSurrogatePair2
                | ParseState::EscapeU6
                | ParseState::EscapeU7
                | ParseState::EscapeU8
                | ParseState::EscapeU9 => self.parse_string(cur)?,
                ParseState::Minus
                | ParseState::Zero
                | ParseState::Integer
                | ParseState::Fraction1
                | ParseState::Fraction2
                | ParseState::Exp1
                | ParseState::Exp2
                | ParseState::Exp3 => self.parse_number(cur)?,
                ParseState::N => self.keyword_step(cur, b'u', ParseState::Nu)?,
                ParseState::Nu => self.keyword_step(cur, b'l', ParseState::Nul)?,
                ParseState::Nul => self.keyword_end(cur, b'l', Keyword::Null)?,
                ParseState::T => self.keyword_step(cur, b'r', ParseState::Tr)?,
                ParseState::Tr => self.keyword_step(cur, b'u', ParseState::Tru)?,
                ParseState::Tru => self.keyword_end(cur, b'e', Keyword::True)?,
                ParseState::F => self.keyword_step(cur, b'a', ParseState::Fa)?,
                ParseState::Fa => self.keyword_step(cur, b'l', ParseState::Fal)?,
                ParseState::Fal => self.keyword_step(cur, b's', ParseState::Fals)?,
                ParseState::Fals => self.keyword_end(cur, b'e', Keyword::False)?,
                ParseState::Slash => self.on_slash(cur)?,
                ParseState::SlashSlash => self.on_slash_slash(cur),
                ParseState::SlashStar => self.on_slash_star(cur),
                ParseState::SlashStarStar => self.on_slash_star_star(cur),
                // container states live only on the state stack; landing here
                // means a previous fatal error was ignored by the caller
                ParseState::Root
                | ParseState::Object
                | ParseState::Array
                | ParseState::MemberName => {
                    return Err(self.fatal(ErrorCode::InvalidJsonText));
                }
                ParseState::Done | ParseState::Lf => unreachable!(),
            }
        }
    }

    // --------------------------------------------------------------------
    // Whitespace, line breaks, comments
    // --------------------------------------------------------------------

    /// Consumes whitespace, line breaks, comment openers and stray control
    /// characters. Returns the next substantive byte unconsumed, or `None`
    /// when the chunk ran out or a transient state took over.
    fn eat_filler(&mut self, cur: &mut Cursor<'_>) -> Result<Option<u8>, ErrorCode> {
        while let Some(b) = cur.peek() {
            match b {
                b' ' | b'\t' => self.skip_whitespace(cur),
                b'\r' => {
                    self.enter_line_break(cur, ParseState::Cr);
                    return Ok(None);
                }
                b'\n' => {
                    self.enter_line_break(cur, ParseState::Lf);
                    return Ok(None);
                }
                b'/' => {
                    self.push_state(self.state);
                    self.bump(cur);
                    self.state = ParseState::Slash;
                    return Ok(None);
                }
                0x00..=0x1F => {
                    self.raise(ErrorCode::IllegalControlCharacter)?;
                    self.bump(cur);
                }
                _ => return Ok(Some(b)),
            }
        }
        Ok(None)
    }

    fn skip_whitespace(&mut self, cur: &mut Cursor<'_>) {
        while matches!(cur.peek(), Some(b' ' | b'\t')) {
            self.bump(cur);
        }
    }

    fn enter_line_break(&mut self, cur: &mut Cursor<'_>, target: ParseState) {
        self.push_state(self.state);
        cur.pos += 1;
        self.ctx.line += 1;
        self.ctx.column = 1;
        self.state = target;
    }

    fn on_slash(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        match cur.peek() {
            Some(b'*') => {
                self.state = ParseState::SlashStar;
                self.raise(ErrorCode::IllegalComment)?;
                self.bump(cur);
            }
            Some(b'/') => {
                self.state = ParseState::SlashSlash;
                self.raise(ErrorCode::IllegalComment)?;
                self.bump(cur);
            }
            Some(_) => {
                self.raise(ErrorCode::InvalidJsonText)?;
                self.bump(cur);
            }
            None => {}
        }
        Ok(())
    }

    fn on_slash_slash(&mut self, cur: &mut Cursor<'_>) {
        match cur.peek() {
            // the line terminator is reprocessed by the resumed state
            Some(b'\r' | b'\n') => self.state = self.pop_state(),
            Some(_) => self.bump(cur),
            None => {}
        }
    }

    fn on_slash_star(&mut self, cur: &mut Cursor<'_>) {
        match cur.peek() {
            Some(b'\r') => self.enter_line_break(cur, ParseState::Cr),
            Some(b'\n') => self.enter_line_break(cur, ParseState::Lf),
            Some(b'*') => {
                self.state = ParseState::SlashStarStar;
                self.bump(cur);
            }
            Some(_) => self.bump(cur),
            None => {}
        }
    }

    fn on_slash_star_star(&mut self, cur: &mut Cursor<'_>) {
        match cur.peek() {
            Some(b'/') => {
                self.state = self.pop_state();
                self.bump(cur);
            }
            Some(_) => {
                self.state = ParseState::SlashStar;
                self.bump(cur);
            }
            None => {}
        }
    }

    // --------------------------------------------------------------------
    // Structural states
    // --------------------------------------------------------------------

    fn on_start(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        if !self.document_started {
            self.document_started = true;
            self.sink.begin_document(&self.ctx);
        }
        match b {
            b'}' => Err(self.fatal(ErrorCode::UnexpectedRightBrace)),
            b']' => Err(self.fatal(ErrorCode::UnexpectedRightBracket)),
            _ => {
                if !self.begin_value(cur, b)? {
                    self.raise(ErrorCode::InvalidJsonText)?;
                    self.bump(cur);
                }
                Ok(())
            }
        }
    }

    fn on_expect_comma_or_end(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        match b {
            b'}' => {
                self.do_end_object()?;
                self.bump(cur);
            }
            b']' => {
                self.do_end_array()?;
                self.bump(cur);
            }
            b',' => {
                self.begin_member_or_element()?;
                self.bump(cur);
            }
            _ => {
                let code = if self.parent() == ParseState::Array {
                    ErrorCode::ExpectedCommaOrRightBracket
                } else {
                    ErrorCode::ExpectedCommaOrRightBrace
                };
                self.raise(code)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    fn on_expect_member_name_or_end(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        match b {
            b'}' => {
                self.do_end_object()?;
                self.bump(cur);
            }
            b'"' => {
                self.bump(cur);
                self.push_state(ParseState::MemberName);
                self.state = ParseState::StringU1;
            }
            b'\'' => {
                self.raise(ErrorCode::SingleQuote)?;
                self.bump(cur);
            }
            _ => {
                self.raise(ErrorCode::ExpectedName)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    fn on_expect_member_name(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        match b {
            b'"' => {
                self.bump(cur);
                self.push_state(ParseState::MemberName);
                self.state = ParseState::StringU1;
            }
            b'}' => {
                // a comma was consumed but the object ends here
                self.raise(ErrorCode::ExtraComma)?;
                self.do_end_object()?;
                self.bump(cur);
            }
            b'\'' => {
                self.raise(ErrorCode::SingleQuote)?;
                self.bump(cur);
            }
            _ => {
                self.raise(ErrorCode::ExpectedName)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    fn on_expect_colon(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        match b {
            b':' => {
                self.state = ParseState::ExpectValue;
                self.bump(cur);
            }
            _ => {
                self.raise(ErrorCode::ExpectedColon)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    fn on_expect_value(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        if self.begin_value(cur, b)? {
            return Ok(());
        }
        match b {
            b']' => {
                if self.parent() == ParseState::Array {
                    self.raise(ErrorCode::ExtraComma)?;
                    self.do_end_array()?;
                } else {
                    self.raise(ErrorCode::ExpectedValue)?;
                }
                self.bump(cur);
            }
            b',' => {
                // consecutive commas; skip and keep expecting a value
                self.raise(ErrorCode::ExtraComma)?;
                self.bump(cur);
            }
            b'\'' => {
                self.raise(ErrorCode::SingleQuote)?;
                self.bump(cur);
            }
            _ => {
                self.raise(ErrorCode::ExpectedValue)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    fn on_expect_value_or_end(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        let Some(b) = self.eat_filler(cur)? else {
            return Ok(());
        };
        if self.begin_value(cur, b)? {
            return Ok(());
        }
        match b {
            b']' => {
                self.do_end_array()?;
                self.bump(cur);
            }
            b'\'' => {
                self.raise(ErrorCode::SingleQuote)?;
                self.bump(cur);
            }
            _ => {
                self.raise(ErrorCode::ExpectedValue)?;
                self.bump(cur);
            }
        }
        Ok(())
    }

    /// Dispatches a value-starting byte. `Ok(false)` means the byte starts
    /// no value and the calling state decides what it was.
    fn begin_value(&mut self, cur: &mut Cursor<'_>, b: u8) -> Result<bool, ErrorCode> {
        match b {
            b'{' => {
                self.do_begin_object()?;
                self.bump(cur);
            }
            b'[' => {
                self.do_begin_array()?;
                self.bump(cur);
            }
            b'"' => {
                self.bump(cur);
                self.state = ParseState::StringU1;
            }
            b'-' => {
                self.is_negative = true;
                self.bump(cur);
                self.state = ParseState::Minus;
            }
            b'0' => {
                self.string_buffer.push('0');
                self.bump(cur);
                self.state = ParseState::Zero;
            }
            b'1'..=b'9' => {
                self.string_buffer.push(char::from(b));
                self.bump(cur);
                self.state = ParseState::Integer;
            }
            b'n' => self.begin_keyword(cur, b"null", Keyword::Null)?,
            b't' => self.begin_keyword(cur, b"true", Keyword::True)?,
            b'f' => self.begin_keyword(cur, b"false", Keyword::False)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    // --------------------------------------------------------------------
    // Containers
    // --------------------------------------------------------------------

    fn do_begin_object(&mut self) -> Result<(), ErrorCode> {
        self.nesting_depth += 1;
        if self.nesting_depth > self.max_depth {
            self.raise(ErrorCode::MaxDepthExceeded)?;
        }
        self.push_state(ParseState::Object);
        self.state = ParseState::ExpectMemberNameOrEnd;
        self.sink.begin_object(&self.ctx);
        Ok(())
    }

    fn do_end_object(&mut self) -> Result<(), ErrorCode> {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
        self.state = self.pop_state();
        match self.state {
            ParseState::Object => self.sink.end_object(&self.ctx),
            ParseState::Array => {
                return Err(self.fatal(ErrorCode::ExpectedCommaOrRightBracket));
            }
            _ => return Err(self.fatal(ErrorCode::UnexpectedRightBrace)),
        }
        if self.parent() == ParseState::Root {
            self.state = ParseState::Done;
            self.sink.end_document(&self.ctx);
        } else {
            self.state = ParseState::ExpectCommaOrEnd;
        }
        Ok(())
    }

    fn do_begin_array(&mut self) -> Result<(), ErrorCode> {
        self.nesting_depth += 1;
        if self.nesting_depth > self.max_depth {
            self.raise(ErrorCode::MaxDepthExceeded)?;
        }
        self.push_state(ParseState::Array);
        self.state = ParseState::ExpectValueOrEnd;
        self.sink.begin_array(&self.ctx);
        Ok(())
    }

    fn do_end_array(&mut self) -> Result<(), ErrorCode> {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
        self.state = self.pop_state();
        match self.state {
            ParseState::Array => self.sink.end_array(&self.ctx),
            ParseState::Object => {
                return Err(self.fatal(ErrorCode::ExpectedCommaOrRightBrace));
            }
            _ => return Err(self.fatal(ErrorCode::UnexpectedRightBracket)),
        }
        if self.parent() == ParseState::Root {
            self.state = ParseState::Done;
            self.sink.end_document(&self.ctx);
        } else {
            self.state = ParseState::ExpectCommaOrEnd;
        }
        Ok(())
    }

    fn begin_member_or_element(&mut self) -> Result<(), ErrorCode> {
        match self.parent() {
            ParseState::Object => {
                self.state = ParseState::ExpectMemberName;
                Ok(())
            }
            ParseState::Array => {
                self.state = ParseState::ExpectValue;
                Ok(())
            }
            ParseState::Root => Ok(()),
            _ => self.raise(ErrorCode::InvalidJsonText),
        }
    }

    /// Transition after a completed value, based on the enclosing frame.
    fn after_value(&mut self) -> Result<(), ErrorCode> {
        match self.parent() {
            ParseState::Object | ParseState::Array => {
                self.state = ParseState::ExpectCommaOrEnd;
                Ok(())
            }
            ParseState::Root => {
                self.state = ParseState::Done;
                self.sink.end_document(&self.ctx);
                Ok(())
            }
            _ => self.raise(ErrorCode::InvalidJsonText),
        }
    }

    // --------------------------------------------------------------------
    // Keywords
    // --------------------------------------------------------------------

    fn begin_keyword(
        &mut self,
        cur: &mut Cursor<'_>,
        text: &'static [u8],
        keyword: Keyword,
    ) -> Result<(), ErrorCode> {
        let rest = cur.remaining();
        if rest.len() >= text.len() {
            if &rest[..text.len()] == text {
                self.emit_keyword(keyword);
                cur.pos += text.len();
                self.ctx.column += text.len();
                self.after_value()?;
            } else {
                return Err(self.abort(ErrorCode::InvalidValue));
            }
        } else {
            // the chunk ends inside the keyword; go byte by byte
            self.bump(cur);
            self.state = match keyword {
                Keyword::Null => ParseState::N,
                Keyword::True => ParseState::T,
                Keyword::False => ParseState::F,
            };
        }
        Ok(())
    }

    fn keyword_step(
        &mut self,
        cur: &mut Cursor<'_>,
        expected: u8,
        next: ParseState,
    ) -> Result<(), ErrorCode> {
        if cur.peek() == Some(expected) {
            self.bump(cur);
            self.state = next;
            Ok(())
        } else {
            Err(self.abort(ErrorCode::InvalidValue))
        }
    }

    fn keyword_end(
        &mut self,
        cur: &mut Cursor<'_>,
        expected: u8,
        keyword: Keyword,
    ) -> Result<(), ErrorCode> {
        if cur.peek() == Some(expected) {
            self.emit_keyword(keyword);
            self.bump(cur);
            self.after_value()
        } else {
            Err(self.abort(ErrorCode::InvalidValue))
        }
    }

    fn emit_keyword(&mut self, keyword: Keyword) {
        match keyword {
            Keyword::Null => self.sink.null_value(&self.ctx),
            Keyword::True => self.sink.bool_value(true, &self.ctx),
            Keyword::False => self.sink.bool_value(false, &self.ctx),
        }
    }

    // --------------------------------------------------------------------
    // Numbers
    // --------------------------------------------------------------------

    fn parse_number(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        loop {
            let Some(b) = cur.peek() else {
                return Ok(());
            };
            match self.state {
                ParseState::Minus => match b {
                    b'0' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Zero;
                    }
                    b'1'..=b'9' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Integer;
                    }
                    _ => return Err(self.abort(ErrorCode::ExpectedValue)),
                },
                ParseState::Zero => match b {
                    b'0'..=b'9' => {
                        self.raise(ErrorCode::LeadingZero)?;
                        self.push_digit(cur, b);
                        self.state = ParseState::Integer;
                    }
                    b'.' => {
                        self.mark_precision();
                        self.push_digit(cur, b);
                        self.state = ParseState::Fraction1;
                    }
                    b'e' | b'E' => {
                        self.mark_precision();
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp1;
                    }
                    b'\r' | b'\n' | b' ' | b'\t' | b'/' | b'}' | b']' | b',' => {
                        return self.end_number(cur, b, false);
                    }
                    _ => return Err(self.abort(ErrorCode::InvalidNumber)),
                },
                ParseState::Integer => match b {
                    b'0'..=b'9' => self.push_digit(cur, b),
                    b'.' => {
                        self.mark_precision();
                        self.push_digit(cur, b);
                        self.state = ParseState::Fraction1;
                    }
                    b'e' | b'E' => {
                        self.mark_precision();
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp1;
                    }
                    b'\r' | b'\n' | b' ' | b'\t' | b'/' | b'}' | b']' | b',' => {
                        return self.end_number(cur, b, false);
                    }
                    _ => return Err(self.abort(ErrorCode::InvalidNumber)),
                },
                ParseState::Fraction1 => match b {
                    b'0'..=b'9' => {
                        self.precision = self.precision.saturating_add(1);
                        self.push_digit(cur, b);
                        self.state = ParseState::Fraction2;
                    }
                    _ => return Err(self.abort(ErrorCode::InvalidNumber)),
                },
                ParseState::Fraction2 => match b {
                    b'0'..=b'9' => {
                        self.precision = self.precision.saturating_add(1);
                        self.push_digit(cur, b);
                    }
                    b'e' | b'E' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp1;
                    }
                    b'\r' | b'\n' | b' ' | b'\t' | b'/' | b'}' | b']' | b',' => {
                        return self.end_number(cur, b, true);
                    }
                    _ => return Err(self.abort(ErrorCode::InvalidNumber)),
                },
                ParseState::Exp1 => match b {
                    // '+' is redundant for conversion and not buffered
                    b'+' => {
                        self.bump(cur);
                        self.state = ParseState::Exp2;
                    }
                    b'-' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp2;
                    }
                    b'0'..=b'9' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp3;
                    }
                    _ => return Err(self.abort(ErrorCode::ExpectedValue)),
                },
                ParseState::Exp2 => match b {
                    b'0'..=b'9' => {
                        self.push_digit(cur, b);
                        self.state = ParseState::Exp3;
                    }
                    _ => return Err(self.abort(ErrorCode::ExpectedValue)),
                },
                ParseState::Exp3 => match b {
                    b'0'..=b'9' => self.push_digit(cur, b),
                    b'\r' | b'\n' | b' ' | b'\t' | b'/' | b'}' | b']' | b',' => {
                        return self.end_number(cur, b, true);
                    }
                    _ => return Err(self.abort(ErrorCode::InvalidNumber)),
                },
                _ => unreachable!("parse_number entered outside a numeric state"),
            }
        }
    }

    fn push_digit(&mut self, cur: &mut Cursor<'_>, b: u8) {
        self.string_buffer.push(char::from(b));
        self.bump(cur);
    }

    /// Records the significant-digit count when `.` or an exponent marker is
    /// first seen.
    fn mark_precision(&mut self) {
        self.precision = number::precision_hint(self.string_buffer.len());
    }

    fn end_number(&mut self, cur: &mut Cursor<'_>, b: u8, fraction: bool) -> Result<(), ErrorCode> {
        if fraction {
            self.end_fraction_value()?;
        } else {
            self.end_integer_value()?;
        }
        match b {
            b'\r' => self.enter_line_break(cur, ParseState::Cr),
            b'\n' => self.enter_line_break(cur, ParseState::Lf),
            b' ' | b'\t' => self.skip_whitespace(cur),
            b'/' => {
                self.push_state(self.state);
                self.bump(cur);
                self.state = ParseState::Slash;
            }
            b'}' => {
                self.do_end_object()?;
                self.bump(cur);
            }
            b']' => {
                self.do_end_array()?;
                self.bump(cur);
            }
            b',' => {
                self.begin_member_or_element()?;
                self.bump(cur);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    fn end_integer_value(&mut self) -> Result<(), ErrorCode> {
        let buffer = mem::take(&mut self.string_buffer);
        let result = self.emit_integer(&buffer);
        self.string_buffer = buffer;
        self.string_buffer.clear();
        self.is_negative = false;
        self.precision = 0;
        result?;
        self.after_value()
    }

    /// Narrowest-lossless emission: `u64`, else `i64`, else `f64`.
    fn emit_integer(&mut self, digits: &str) -> Result<(), ErrorCode> {
        if self.is_negative {
            if let Some(value) = number::parse_negative(digits) {
                self.sink.integer_value(value, &self.ctx);
                return Ok(());
            }
        } else if let Some(value) = number::parse_unsigned(digits) {
            self.sink.uinteger_value(value, &self.ctx);
            return Ok(());
        }
        match number::parse_double(digits) {
            Some(value) => {
                let value = if self.is_negative { -value } else { value };
                self.sink
                    .double_value(value, number::precision_hint(digits.len()), &self.ctx);
                Ok(())
            }
            None => {
                self.raise(ErrorCode::InvalidNumber)?;
                self.sink.null_value(&self.ctx);
                Ok(())
            }
        }
    }

    fn end_fraction_value(&mut self) -> Result<(), ErrorCode> {
        let buffer = mem::take(&mut self.string_buffer);
        let result = self.emit_fraction(&buffer);
        self.string_buffer = buffer;
        self.string_buffer.clear();
        self.is_negative = false;
        self.precision = 0;
        result?;
        self.after_value()
    }

    fn emit_fraction(&mut self, digits: &str) -> Result<(), ErrorCode> {
        match number::parse_double(digits) {
            Some(value) => {
                let value = if self.is_negative { -value } else { value };
                self.sink.double_value(value, self.precision, &self.ctx);
                Ok(())
            }
            None => {
                self.raise(ErrorCode::InvalidNumber)?;
                self.sink.null_value(&self.ctx);
                Ok(())
            }
        }
    }

    // --------------------------------------------------------------------
    // Strings and escapes
    // --------------------------------------------------------------------

    fn parse_string(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        loop {
            if cur.is_empty() {
                return Ok(());
            }
            match self.state {
                ParseState::StringU1 => self.string_body(cur)?,
                ParseState::Escape => {
                    let Some(b) = cur.peek() else {
                        return Ok(());
                    };
                    let unescaped = match b {
                        b'"' => Some('"'),
                        b'\\' => Some('\\'),
                        b'/' => Some('/'),
                        b'b' => Some('\u{8}'),
                        b'f' => Some('\u{C}'),
                        b'n' => Some('\n'),
                        b'r' => Some('\r'),
                        b't' => Some('\t'),
                        b'u' => None,
                        _ => return Err(self.abort(ErrorCode::IllegalEscapedCharacter)),
                    };
                    match unescaped {
                        Some(ch) => {
                            self.string_buffer.push(ch);
                            self.bump(cur);
                            self.state = ParseState::StringU1;
                        }
                        None => {
                            self.codepoint.begin_first();
                            self.bump(cur);
                            self.state = ParseState::EscapeU1;
                        }
                    }
                }
                ParseState::EscapeU1 => self.escape_hex(cur, false, ParseState::EscapeU2)?,
                ParseState::EscapeU2 => self.escape_hex(cur, false, ParseState::EscapeU3)?,
                ParseState::EscapeU3 => self.escape_hex(cur, false, ParseState::EscapeU4)?,
                ParseState::EscapeU4 => {
                    let Some(b) = cur.peek() else {
                        return Ok(());
                    };
                    self.push_hex(cur, b, false)?;
                    if self.codepoint.first_is_high_surrogate() {
                        self.state = ParseState::EscapeExpectSurrogatePair1;
                    } else {
                        self.push_scalar(self.codepoint.first())?;
                        self.state = ParseState::StringU1;
                    }
                }
                ParseState::EscapeExpectSurrogatePair1 => {
                    let Some(b) = cur.peek() else {
                        return Ok(());
                    };
                    if b == b'\\' {
                        self.codepoint.begin_second();
                        self.bump(cur);
                        self.state = ParseState::EscapeExpectSurrogatePair2;
                    } else {
                        return Err(self.abort(ErrorCode::ExpectedCodepointSurrogatePair));
                    }
                }
                ParseState::EscapeExpectSurrogatePair2 => {
                    let Some(b) = cur.peek() else {
                        return Ok(());
                    };
                    if b == b'u' {
                        self.bump(cur);
                        self.state = ParseState::EscapeU6;
                    } else {
                        return Err(self.abort(ErrorCode::ExpectedCodepointSurrogatePair));
                    }
                }
                ParseState::EscapeU6 => self.escape_hex(cur, true, ParseState::EscapeU7)?,
                ParseState::EscapeU7 => self.escape_hex(cur, true, ParseState::EscapeU8)?,
                ParseState::EscapeU8 => self.escape_hex(cur, true, ParseState::EscapeU9)?,
                ParseState::EscapeU9 => {
                    let Some(b) = cur.peek() else {
                        return Ok(());
                    };
                    self.push_hex(cur, b, true)?;
                    let scalar = self.codepoint.combined();
                    self.string_buffer
                        .push(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
                    self.state = ParseState::StringU1;
                }
                // the string terminated or a line-break state took over
                _ => return Ok(()),
            }
        }
    }

    /// One pass over the unescaped body: completes a chunk-split UTF-8
    /// character, then captures a contiguous run up to the next special
    /// byte.
    fn string_body(&mut self, cur: &mut Cursor<'_>) -> Result<(), ErrorCode> {
        while !self.pending_utf8.is_empty() {
            let Some(b) = cur.peek() else {
                return Ok(());
            };
            if utf8::is_continuation(b) {
                self.bump(cur);
                if self.pending_utf8.push(b) {
                    match utf8::validate(self.pending_utf8.bytes()) {
                        Ok(s) => {
                            let ch = s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                            self.string_buffer.push(ch);
                        }
                        Err(e) => {
                            self.raise(utf8_error_code(e.kind))?;
                            self.string_buffer.push(char::REPLACEMENT_CHARACTER);
                        }
                    }
                    self.pending_utf8.clear();
                }
            } else {
                self.raise(ErrorCode::ExpectedContinuationByte)?;
                self.string_buffer.push(char::REPLACEMENT_CHARACTER);
                self.pending_utf8.clear();
                // b is reprocessed by the run scan below
            }
        }

        let run_start = cur.pos;
        loop {
            let Some(b) = cur.peek() else {
                self.ctx.column += cur.pos - run_start;
                let run = &cur.input[run_start..cur.pos];
                return self.append_run(run, true);
            };
            match b {
                b'"' => {
                    self.ctx.column += cur.pos - run_start;
                    let run = &cur.input[run_start..cur.pos];
                    if self.string_buffer.is_empty() {
                        // zero-copy fast path straight from the input slice
                        match utf8::validate(run) {
                            Ok(s) => self.end_string(s)?,
                            Err(_) => {
                                self.append_run(run, false)?;
                                self.end_buffered_string()?;
                            }
                        }
                    } else {
                        self.append_run(run, false)?;
                        self.end_buffered_string()?;
                    }
                    self.bump(cur);
                    return Ok(());
                }
                b'\\' => {
                    self.ctx.column += cur.pos - run_start;
                    let run = &cur.input[run_start..cur.pos];
                    self.append_run(run, false)?;
                    self.bump(cur);
                    self.state = ParseState::Escape;
                    return Ok(());
                }
                b'\t' | b'\n' | b'\r' => {
                    self.ctx.column += cur.pos - run_start;
                    self.raise(ErrorCode::IllegalCharacterInString)?;
                    // recovery keeps the character
                    let run = &cur.input[run_start..cur.pos];
                    self.append_run(run, false)?;
                    self.string_buffer.push(char::from(b));
                    match b {
                        b'\r' => self.enter_line_break(cur, ParseState::Cr),
                        b'\n' => self.enter_line_break(cur, ParseState::Lf),
                        _ => self.bump(cur),
                    }
                    return Ok(());
                }
                0x00..=0x1F => {
                    self.ctx.column += cur.pos - run_start;
                    self.raise(ErrorCode::IllegalControlCharacter)?;
                    // recovery skips the byte
                    let run = &cur.input[run_start..cur.pos];
                    self.append_run(run, false)?;
                    self.bump(cur);
                    return Ok(());
                }
                _ => cur.pos += 1,
            }
        }
    }

    /// Validates a verbatim run and appends it to the scratch buffer. At a
    /// chunk boundary an incomplete trailing sequence is stashed for the
    /// next chunk rather than reported.
    fn append_run(&mut self, mut run: &[u8], at_chunk_end: bool) -> Result<(), ErrorCode> {
        loop {
            match utf8::validate(run) {
                Ok(s) => {
                    self.string_buffer.push_str(s);
                    return Ok(());
                }
                Err(e) => {
                    if let Ok(prefix) = core::str::from_utf8(&run[..e.valid_up_to]) {
                        self.string_buffer.push_str(prefix);
                    }
                    match e.error_len {
                        None => {
                            if at_chunk_end {
                                self.pending_utf8.start(&run[e.valid_up_to..]);
                                return Ok(());
                            }
                            self.raise(ErrorCode::ExpectedContinuationByte)?;
                            self.string_buffer.push(char::REPLACEMENT_CHARACTER);
                            return Ok(());
                        }
                        Some(len) => {
                            self.raise(utf8_error_code(e.kind))?;
                            self.string_buffer.push(char::REPLACEMENT_CHARACTER);
                            run = &run[e.valid_up_to + len..];
                        }
                    }
                }
            }
        }
    }

    fn escape_hex(
        &mut self,
        cur: &mut Cursor<'_>,
        second: bool,
        next: ParseState,
    ) -> Result<(), ErrorCode> {
        let Some(b) = cur.peek() else {
            return Ok(());
        };
        self.push_hex(cur, b, second)?;
        self.state = next;
        Ok(())
    }

    fn push_hex(&mut self, cur: &mut Cursor<'_>, b: u8, second: bool) -> Result<(), ErrorCode> {
        match codepoint::hex_digit(b) {
            Some(digit) => {
                if second {
                    self.codepoint.push_second(digit);
                } else {
                    self.codepoint.push_first(digit);
                }
            }
            // recovery treats the digit as absent
            None => self.raise(ErrorCode::InvalidHexEscapeSequence)?,
        }
        self.bump(cur);
        Ok(())
    }

    fn push_scalar(&mut self, scalar: u32) -> Result<(), ErrorCode> {
        match char::from_u32(scalar) {
            Some(ch) => self.string_buffer.push(ch),
            None => {
                // a high surrogate takes the pair path, so this is a lone low
                self.raise(ErrorCode::IllegalSurrogateValue)?;
                self.string_buffer.push(char::REPLACEMENT_CHARACTER);
            }
        }
        Ok(())
    }

    fn end_string(&mut self, value: &str) -> Result<(), ErrorCode> {
        match self.parent() {
            ParseState::MemberName => {
                self.sink.name(value, &self.ctx);
                let _ = self.pop_state();
                self.state = ParseState::ExpectColon;
                Ok(())
            }
            ParseState::Object | ParseState::Array => {
                self.sink.string_value(value, &self.ctx);
                self.state = ParseState::ExpectCommaOrEnd;
                Ok(())
            }
            ParseState::Root => {
                self.sink.string_value(value, &self.ctx);
                self.state = ParseState::Done;
                self.sink.end_document(&self.ctx);
                Ok(())
            }
            _ => self.raise(ErrorCode::InvalidJsonText),
        }
    }

    fn end_buffered_string(&mut self) -> Result<(), ErrorCode> {
        let buffer = mem::take(&mut self.string_buffer);
        let result = self.end_string(&buffer);
        self.string_buffer = buffer;
        self.string_buffer.clear();
        result
    }

    // --------------------------------------------------------------------
    // Flush and trailing input
    // --------------------------------------------------------------------

    fn end_parse(&mut self) -> Result<(), ErrorCode> {
        if self.parent() == ParseState::Root {
            match self.state {
                ParseState::Zero | ParseState::Integer => self.end_integer_value()?,
                ParseState::Fraction2 | ParseState::Exp3 => self.end_fraction_value()?,
                _ => {}
            }
        }
        if matches!(self.state, ParseState::Cr | ParseState::Lf) {
            self.state = self.pop_state();
        }
        if !matches!(self.state, ParseState::Done | ParseState::Start) {
            self.raise(ErrorCode::UnexpectedEof)?;
        }
        Ok(())
    }

    fn check_done_inner(&mut self, rest: &[u8]) -> Result<(), ErrorCode> {
        if self.state != ParseState::Done {
            self.raise(ErrorCode::UnexpectedEof)?;
        }
        let mut cur = Cursor {
            input: rest,
            pos: 0,
        };
        while let Some(b) = cur.peek() {
            match b {
                b' ' | b'\t' => self.bump(&mut cur),
                b'\n' => {
                    cur.pos += 1;
                    self.ctx.line += 1;
                    self.ctx.column = 1;
                }
                b'\r' => {
                    cur.pos += 1;
                    self.ctx.line += 1;
                    self.ctx.column = 1;
                    if cur.peek() == Some(b'\n') {
                        cur.pos += 1;
                    }
                }
                _ => {
                    self.raise(ErrorCode::ExtraCharacter)?;
                    self.bump(&mut cur);
                }
            }
        }
        Ok(())
    }

    fn skip_trailing_filler(&mut self, cur: &mut Cursor<'_>) {
        while let Some(b) = cur.peek() {
            match b {
                b' ' | b'\t' => self.bump(cur),
                b'\n' => {
                    cur.pos += 1;
                    self.ctx.line += 1;
                    self.ctx.column = 1;
                }
                b'\r' => {
                    cur.pos += 1;
                    self.ctx.line += 1;
                    self.ctx.column = 1;
                    if cur.peek() == Some(b'\n') {
                        cur.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    // --------------------------------------------------------------------
    // State stack and error plumbing
    // --------------------------------------------------------------------

    fn push_state(&mut self, state: ParseState) {
        self.state_stack.push(state);
    }

    fn pop_state(&mut self) -> ParseState {
        self.state_stack.pop().unwrap_or(ParseState::Root)
    }

    fn parent(&self) -> ParseState {
        self.state_stack.last().copied().unwrap_or(ParseState::Root)
    }

    fn bump(&mut self, cur: &mut Cursor<'_>) {
        cur.pos += 1;
        self.ctx.column += 1;
    }

    /// Reports a recoverable anomaly; `Err` when the policy says stop.
    fn raise(&mut self, code: ErrorCode) -> Result<(), ErrorCode> {
        match self.err_handler.error(code, &self.ctx) {
            ErrorAction::Continue => Ok(()),
            ErrorAction::Stop => Err(code),
        }
    }

    /// Reports an anomaly that has no recovery; stops regardless of the
    /// policy's answer.
    fn abort(&mut self, code: ErrorCode) -> ErrorCode {
        let _ = self.err_handler.error(code, &self.ctx);
        code
    }

    fn fatal(&mut self, code: ErrorCode) -> ErrorCode {
        self.err_handler.fatal_error(code, &self.ctx);
        code
    }
}

fn utf8_error_code(kind: Utf8ErrorKind) -> ErrorCode {
    match kind {
        Utf8ErrorKind::OverLong => ErrorCode::OverLongUtf8Sequence,
        Utf8ErrorKind::ExpectedContinuationByte => ErrorCode::ExpectedContinuationByte,
        Utf8ErrorKind::UnpairedHighSurrogate => ErrorCode::UnpairedHighSurrogate,
        Utf8ErrorKind::IllegalSurrogate => ErrorCode::IllegalSurrogateValue,
        Utf8ErrorKind::IllegalCodepoint => ErrorCode::IllegalCodepoint,
    }
}

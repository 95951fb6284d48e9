//! The event sink contract and the location view passed to it.
//!
//! A [`JsonEventSink`] receives the structural events of a parse in document
//! order: `begin_document`, containers, member names, scalar values,
//! `end_document`. String and name views borrow either from the caller's
//! input chunk or from the parser's scratch buffer and are valid only for
//! the duration of the call; copy if you need to retain them.
//!
//! All methods have empty default bodies, so a sink only implements what it
//! cares about and [`NullSink`] (pure validation) is trivial.

/// Location view handed to sinks and error handlers.
///
/// This is a narrow capability: line and column only, so collaborators can
/// report positions but cannot reach into parser internals. Both counters
/// are 1-based; `column` is counted in bytes and identifies the next
/// unconsumed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl ParseContext {
    pub(crate) fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for parse events.
///
/// Events arrive strictly in input order; a structural event for depth *d*
/// always completes before any event for depth *d + 1* or for the next
/// sibling at *d*. `begin_document` is delivered exactly once when the first
/// substantive byte is seen and `end_document` exactly once when the
/// outermost value terminates.
///
/// # Examples
///
/// ```rust
/// use jsonpush::{JsonEventSink, ParseContext, PushParser};
///
/// #[derive(Default)]
/// struct KeyCollector(Vec<String>);
///
/// impl JsonEventSink for KeyCollector {
///     fn name(&mut self, name: &str, _ctx: &ParseContext) {
///         self.0.push(name.to_string());
///     }
/// }
///
/// let mut parser = PushParser::with_sink(KeyCollector::default());
/// parser.parse(br#"{"a": 1, "b": {"c": null}}"#)?;
/// parser.finish()?;
/// assert_eq!(parser.sink().0, ["a", "b", "c"]);
/// # Ok::<(), jsonpush::ParseError>(())
/// ```
#[allow(unused_variables)]
pub trait JsonEventSink {
    fn begin_document(&mut self, ctx: &ParseContext) {}

    fn end_document(&mut self, ctx: &ParseContext) {}

    fn begin_object(&mut self, ctx: &ParseContext) {}

    fn end_object(&mut self, ctx: &ParseContext) {}

    fn begin_array(&mut self, ctx: &ParseContext) {}

    fn end_array(&mut self, ctx: &ParseContext) {}

    /// An object member name. Always followed by the member's value events.
    fn name(&mut self, name: &str, ctx: &ParseContext) {}

    fn string_value(&mut self, value: &str, ctx: &ParseContext) {}

    fn integer_value(&mut self, value: i64, ctx: &ParseContext) {}

    fn uinteger_value(&mut self, value: u64, ctx: &ParseContext) {}

    /// A double, with an approximate significant-digit count as a formatting
    /// hint.
    fn double_value(&mut self, value: f64, precision: u8, ctx: &ParseContext) {}

    fn bool_value(&mut self, value: bool, ctx: &ParseContext) {}

    fn null_value(&mut self, ctx: &ParseContext) {}
}

/// Sink that discards every event. Parsing into it is pure validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl JsonEventSink for NullSink {}

impl<S: JsonEventSink + ?Sized> JsonEventSink for &mut S {
    fn begin_document(&mut self, ctx: &ParseContext) {
        (**self).begin_document(ctx);
    }

    fn end_document(&mut self, ctx: &ParseContext) {
        (**self).end_document(ctx);
    }

    fn begin_object(&mut self, ctx: &ParseContext) {
        (**self).begin_object(ctx);
    }

    fn end_object(&mut self, ctx: &ParseContext) {
        (**self).end_object(ctx);
    }

    fn begin_array(&mut self, ctx: &ParseContext) {
        (**self).begin_array(ctx);
    }

    fn end_array(&mut self, ctx: &ParseContext) {
        (**self).end_array(ctx);
    }

    fn name(&mut self, name: &str, ctx: &ParseContext) {
        (**self).name(name, ctx);
    }

    fn string_value(&mut self, value: &str, ctx: &ParseContext) {
        (**self).string_value(value, ctx);
    }

    fn integer_value(&mut self, value: i64, ctx: &ParseContext) {
        (**self).integer_value(value, ctx);
    }

    fn uinteger_value(&mut self, value: u64, ctx: &ParseContext) {
        (**self).uinteger_value(value, ctx);
    }

    fn double_value(&mut self, value: f64, precision: u8, ctx: &ParseContext) {
        (**self).double_value(value, precision, ctx);
    }

    fn bool_value(&mut self, value: bool, ctx: &ParseContext) {
        (**self).bool_value(value, ctx);
    }

    fn null_value(&mut self, ctx: &ParseContext) {
        (**self).null_value(ctx);
    }
}

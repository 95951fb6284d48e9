use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use crate::{
    ErrorAction, ErrorCode, JsonEventSink, ParseContext, ParseError, ParseErrorHandler,
    PushParser,
};

/// Owned mirror of the sink callbacks, for comparing event streams.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginDocument,
    EndDocument,
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name(String),
    Str(String),
    Int(i64),
    Uint(u64),
    Double(f64, u8),
    Bool(bool),
    Null,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::BeginDocument => write!(f, "begin_document"),
            Event::EndDocument => write!(f, "end_document"),
            Event::BeginObject => write!(f, "begin_object"),
            Event::EndObject => write!(f, "end_object"),
            Event::BeginArray => write!(f, "begin_array"),
            Event::EndArray => write!(f, "end_array"),
            Event::Name(s) => write!(f, "name({s})"),
            Event::Str(s) => write!(f, "string({s})"),
            Event::Int(v) => write!(f, "integer({v})"),
            Event::Uint(v) => write!(f, "uinteger({v})"),
            Event::Double(v, p) => write!(f, "double({v:?}, p={p})"),
            Event::Bool(v) => write!(f, "bool({v})"),
            Event::Null => write!(f, "null"),
        }
    }
}

/// Sink that records every event in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl JsonEventSink for Recorder {
    fn begin_document(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::BeginDocument);
    }

    fn end_document(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::EndDocument);
    }

    fn begin_object(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::BeginObject);
    }

    fn end_object(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::EndObject);
    }

    fn begin_array(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::BeginArray);
    }

    fn end_array(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::EndArray);
    }

    fn name(&mut self, name: &str, _ctx: &ParseContext) {
        self.events.push(Event::Name(name.to_string()));
    }

    fn string_value(&mut self, value: &str, _ctx: &ParseContext) {
        self.events.push(Event::Str(value.to_string()));
    }

    fn integer_value(&mut self, value: i64, _ctx: &ParseContext) {
        self.events.push(Event::Int(value));
    }

    fn uinteger_value(&mut self, value: u64, _ctx: &ParseContext) {
        self.events.push(Event::Uint(value));
    }

    fn double_value(&mut self, value: f64, precision: u8, _ctx: &ParseContext) {
        self.events.push(Event::Double(value, precision));
    }

    fn bool_value(&mut self, value: bool, _ctx: &ParseContext) {
        self.events.push(Event::Bool(value));
    }

    fn null_value(&mut self, _ctx: &ParseContext) {
        self.events.push(Event::Null);
    }
}

/// Error handler that records anomalies and always keeps going.
#[derive(Debug, Default)]
pub struct Lenient {
    pub reported: Vec<ErrorCode>,
    pub fatal: Vec<ErrorCode>,
}

impl ParseErrorHandler for Lenient {
    fn error(&mut self, code: ErrorCode, _ctx: &ParseContext) -> ErrorAction {
        self.reported.push(code);
        ErrorAction::Continue
    }

    fn fatal_error(&mut self, code: ErrorCode, _ctx: &ParseContext) {
        self.fatal.push(code);
    }
}

/// Parses `input` in one chunk with the strict policy.
pub fn record(input: &str) -> Result<Vec<Event>, ParseError> {
    record_bytes(input.as_bytes())
}

pub fn record_bytes(input: &[u8]) -> Result<Vec<Event>, ParseError> {
    let mut parser = PushParser::with_sink(Recorder::default());
    let consumed = parser.parse(input)?;
    parser.finish()?;
    parser.check_done(&input[consumed..])?;
    Ok(parser.into_sink().events)
}

/// Parses `input` sliced at the given boundaries.
pub fn record_chunked(chunks: &[&[u8]]) -> Result<Vec<Event>, ParseError> {
    let mut parser = PushParser::with_sink(Recorder::default());
    let mut leftover = Vec::new();
    for chunk in chunks {
        if parser.done() {
            leftover.extend_from_slice(chunk);
            continue;
        }
        let consumed = parser.parse(chunk)?;
        leftover.extend_from_slice(&chunk[consumed..]);
    }
    parser.finish()?;
    parser.check_done(&leftover)?;
    Ok(parser.into_sink().events)
}

/// Parses leniently, returning the events and the reported anomalies.
pub fn record_lenient(input: &str) -> (Vec<Event>, Vec<ErrorCode>, Result<(), ParseError>) {
    let mut parser = PushParser::with_sink_and_handler(Recorder::default(), Lenient::default());
    let result = parser
        .parse(input.as_bytes())
        .map(|_| ())
        .and_then(|()| parser.finish());
    let reported = core::mem::take(&mut parser.error_handler_mut().reported);
    let events = core::mem::take(&mut parser.sink_mut().events);
    (events, reported, result)
}

/// One line per event, for snapshot assertions.
pub fn render(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&event.to_string());
        out.push('\n');
    }
    out
}

/// Minimal document model for round-trip style tests, in the spirit of a
/// DOM a sink consumer would build.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Uint(u64),
    Int(i64),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(true) => write!(f, "true"),
            Value::Bool(false) => write!(f, "false"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::Str(s) => write_json_string(f, s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(members) => {
                write!(f, "{{")?;
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write_json_string(f, key)?;
                    write!(f, ":{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_json_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

enum Node {
    Object(BTreeMap<String, Value>),
    Array(Vec<Value>),
}

/// Sink that assembles a [`Value`] from the event stream.
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<(Node, Option<String>)>,
    pub result: Option<Value>,
}

impl ValueBuilder {
    fn put(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.result = Some(value),
            Some((Node::Object(members), key)) => {
                let key = key.take().expect("member value without a name");
                members.insert(key, value);
            }
            Some((Node::Array(items), _)) => items.push(value),
        }
    }
}

impl JsonEventSink for ValueBuilder {
    fn begin_object(&mut self, _ctx: &ParseContext) {
        self.stack.push((Node::Object(BTreeMap::new()), None));
    }

    fn end_object(&mut self, _ctx: &ParseContext) {
        let (node, _) = self.stack.pop().expect("unbalanced end_object");
        match node {
            Node::Object(members) => self.put(Value::Object(members)),
            Node::Array(_) => panic!("end_object closed an array"),
        }
    }

    fn begin_array(&mut self, _ctx: &ParseContext) {
        self.stack.push((Node::Array(Vec::new()), None));
    }

    fn end_array(&mut self, _ctx: &ParseContext) {
        let (node, _) = self.stack.pop().expect("unbalanced end_array");
        match node {
            Node::Array(items) => self.put(Value::Array(items)),
            Node::Object(_) => panic!("end_array closed an object"),
        }
    }

    fn name(&mut self, name: &str, _ctx: &ParseContext) {
        match self.stack.last_mut() {
            Some((Node::Object(_), key)) => *key = Some(name.to_string()),
            _ => panic!("name outside an object"),
        }
    }

    fn string_value(&mut self, value: &str, _ctx: &ParseContext) {
        self.put(Value::Str(value.to_string()));
    }

    fn integer_value(&mut self, value: i64, _ctx: &ParseContext) {
        self.put(Value::Int(value));
    }

    fn uinteger_value(&mut self, value: u64, _ctx: &ParseContext) {
        self.put(Value::Uint(value));
    }

    fn double_value(&mut self, value: f64, _precision: u8, _ctx: &ParseContext) {
        self.put(Value::Double(value));
    }

    fn bool_value(&mut self, value: bool, _ctx: &ParseContext) {
        self.put(Value::Bool(value));
    }

    fn null_value(&mut self, _ctx: &ParseContext) {
        self.put(Value::Null);
    }
}

/// Parses a document into a [`Value`].
pub fn to_value(input: &[u8]) -> Result<Value, ParseError> {
    let mut parser = PushParser::with_sink(ValueBuilder::default());
    let consumed = parser.parse(input)?;
    parser.finish()?;
    parser.check_done(&input[consumed..])?;
    Ok(parser
        .into_sink()
        .result
        .expect("document finished without a root value"))
}

#![allow(dead_code)]

use jsonpush::{
    ErrorAction, ErrorCode, JsonEventSink, ParseContext, ParseError, ParseErrorHandler,
    PushParser,
};

/// Owned mirror of the sink callbacks.
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

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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

/// Sink recording every event in order.
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

/// Handler that records every anomaly and always continues.
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

pub fn record(input: &str) -> Result<Vec<Event>, ParseError> {
    let input = input.as_bytes();
    let mut parser = PushParser::with_sink(Recorder::default());
    let consumed = parser.parse(input)?;
    parser.finish()?;
    parser.check_done(&input[consumed..])?;
    Ok(parser.into_sink().events)
}

pub fn record_chunked(chunks: &[&str]) -> Result<Vec<Event>, ParseError> {
    let mut parser = PushParser::with_sink(Recorder::default());
    let mut leftover = Vec::new();
    for chunk in chunks {
        let chunk = chunk.as_bytes();
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

/// One line per event, for snapshot assertions.
pub fn render(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&event.to_string());
        out.push('\n');
    }
    out
}

/// Sink building a `serde_json::Value`, for cross-checking against the
/// reference parser.
#[derive(Default)]
pub struct SerdeBuilder {
    stack: Vec<(serde_json::Value, Option<String>)>,
    pub result: Option<serde_json::Value>,
}

impl SerdeBuilder {
    fn put(&mut self, value: serde_json::Value) {
        match self.stack.last_mut() {
            None => self.result = Some(value),
            Some((serde_json::Value::Object(members), key)) => {
                let key = key.take().expect("member value without a name");
                members.insert(key, value);
            }
            Some((serde_json::Value::Array(items), _)) => items.push(value),
            Some(_) => unreachable!("only containers are stacked"),
        }
    }
}

impl JsonEventSink for SerdeBuilder {
    fn begin_object(&mut self, _ctx: &ParseContext) {
        self.stack
            .push((serde_json::Value::Object(serde_json::Map::new()), None));
    }

    fn end_object(&mut self, _ctx: &ParseContext) {
        let (node, _) = self.stack.pop().expect("unbalanced end_object");
        self.put(node);
    }

    fn begin_array(&mut self, _ctx: &ParseContext) {
        self.stack.push((serde_json::Value::Array(Vec::new()), None));
    }

    fn end_array(&mut self, _ctx: &ParseContext) {
        let (node, _) = self.stack.pop().expect("unbalanced end_array");
        self.put(node);
    }

    fn name(&mut self, name: &str, _ctx: &ParseContext) {
        match self.stack.last_mut() {
            Some((serde_json::Value::Object(_), key)) => *key = Some(name.to_string()),
            _ => panic!("name outside an object"),
        }
    }

    fn string_value(&mut self, value: &str, _ctx: &ParseContext) {
        self.put(serde_json::Value::String(value.to_string()));
    }

    fn integer_value(&mut self, value: i64, _ctx: &ParseContext) {
        self.put(serde_json::Value::from(value));
    }

    fn uinteger_value(&mut self, value: u64, _ctx: &ParseContext) {
        self.put(serde_json::Value::from(value));
    }

    fn double_value(&mut self, value: f64, _precision: u8, _ctx: &ParseContext) {
        self.put(serde_json::Value::from(value));
    }

    fn bool_value(&mut self, value: bool, _ctx: &ParseContext) {
        self.put(serde_json::Value::Bool(value));
    }

    fn null_value(&mut self, _ctx: &ParseContext) {
        self.put(serde_json::Value::Null);
    }
}

pub fn to_serde_value(input: &str) -> serde_json::Value {
    let input = input.as_bytes();
    let mut parser = PushParser::with_sink(SerdeBuilder::default());
    let consumed = parser.parse(input).expect("parse failed");
    parser.finish().expect("finish failed");
    parser.check_done(&input[consumed..]).expect("trailing bytes");
    parser.into_sink().result.expect("no root value")
}

/// A structured response document cut at transition seams, to exercise
/// resumption in every token kind.
pub const DOCUMENT: &str = r#"{"job":{"id":90714,"state":"done","progress":1.0},"artifacts":[{"name":"report.pdf","bytes":183211,"checksum":"9fé"},{"name":"log.txt","bytes":0,"checksum":null}],"warnings":["skipped 2 entries","retried \"fetch\" once"],"elapsed":-12.5e-2,"ok":true}"#;

#[rustfmt::skip]
pub const STREAM: [&str; 12] = [
    "{\"job\":{\"id\":907",                         // mid-number
    "14,\"state\":\"do",                            // mid-string
    "ne\",\"progress\":1.0},\"artifacts\":[{\"na",  // container close seam
    "me\":\"report.pdf\",\"bytes\":183211,\"checksum\":\"9f\\u00",  // mid-escape
    "e9\"},{\"name\":\"log.txt\",\"byt",
    "es\":0,\"checksum\":nu",                       // mid-keyword
    "ll}],\"warnings\":[\"skipped 2 entries\",\"retried \\\"fe",
    "tch\\\" once\"],\"elapsed\":-12.5",
    "e-",                                               // mid-exponent
    "2,\"ok\":tr",
    "ue",
    "}",
];

//! Generic JSON value model and the text boundary.
//!
//! The engine never touches text: it reads and writes `serde_json::Value`
//! built with `preserve_order` (objects keep insertion order) and
//! `arbitrary_precision` (numbers keep their exact value and digits, so
//! `1.10` stays `1.10` and integers never turn into floats; exponents are
//! normalized, `1e3` renders as `1e+3`).
use std::fmt;
use std::io::{Read, Write};

use serde::Serialize;
use serde_json::Number;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{CodecError, Result};

pub type Json = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind { Null, Bool, Number, String, Array, Object }

pub fn kind_of(v: &Json) -> JsonKind {
    match v {
        Json::Null      => JsonKind::Null,
        Json::Bool(_)   => JsonKind::Bool,
        Json::Number(_) => JsonKind::Number,
        Json::String(_) => JsonKind::String,
        Json::Array(_)  => JsonKind::Array,
        Json::Object(_) => JsonKind::Object,
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(s)
    }
}

/// True when the literal has no fraction and no exponent.
pub fn is_integer_literal(n: &Number) -> bool {
    !n.to_string().contains(['.', 'e', 'E'])
}

// ------------------------------- Text I/O -------------------------------- //

pub fn parse(text: &str) -> Result<Json> {
    serde_json::from_str(text).map_err(CodecError::Parse)
}

pub fn parse_reader<R: Read>(source: R) -> Result<Json> {
    serde_json::from_reader(source).map_err(|e| {
        if e.is_io() { CodecError::Io(e.into()) } else { CodecError::Parse(e) }
    })
}

/// Compact text, or pretty-printed with `indent` spaces per level.
pub fn render(value: &Json, indent: Option<usize>) -> Result<String> {
    let mut buf = Vec::new();
    render_to(&mut buf, value, indent)?;
    // serde_json only ever writes UTF-8.
    String::from_utf8(buf).map_err(|e| CodecError::Io(std::io::Error::other(e)))
}

pub fn render_to<W: Write>(sink: W, value: &Json, indent: Option<usize>) -> Result<()> {
    let written = match indent {
        None => serde_json::to_writer(sink, value),
        Some(width) => {
            let pad = vec![b' '; width];
            let mut ser = Serializer::with_formatter(sink, PrettyFormatter::with_indent(&pad));
            value.serialize(&mut ser)
        }
    };
    written.map_err(|e| CodecError::Io(e.into()))
}

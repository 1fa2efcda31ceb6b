//! Bundled JSend renderers.

use crate::error::EnvelopeStatus;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::io;

pub const JSON: &str = "application/json";
pub const DEBUG_JSON: &str = "application/debuggablejson";
pub const YAML: &str = "application/yaml";

#[derive(Serialize)]
struct Envelope<'a> {
    status: &'a str,
    data: &'a Value,
}

/// `{"status":"success","data":...}` without whitespace.
pub fn jsend_json(status: EnvelopeStatus, data: &Value) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Envelope {
        status: status.as_str(),
        data,
    })?)
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Pretty printer that writes every non-ASCII character as `\uXXXX`,
/// astral characters as a surrogate pair.
struct AsciiPretty<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiPretty<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Human-oriented JSend: keys sorted at every level, four-space indent,
/// output restricted to ASCII.
///
/// Clients diff these bodies, so the layout is fixed:
/// `{\n    "data": {},\n    "status": "success"\n}`.
pub fn debuggable_jsend_json(status: EnvelopeStatus, data: &Value) -> anyhow::Result<Vec<u8>> {
    let mut envelope = Map::new();
    envelope.insert("data".to_string(), sort_keys(data));
    envelope.insert("status".to_string(), Value::String(status.as_str().to_string()));

    let mut out = Vec::new();
    let formatter = AsciiPretty(PrettyFormatter::with_indent(b"    "));
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    Value::Object(envelope).serialize(&mut ser)?;
    Ok(out)
}

pub fn jsend_yaml(status: EnvelopeStatus, data: &Value) -> anyhow::Result<Vec<u8>> {
    let text = serde_yaml::to_string(&Envelope {
        status: status.as_str(),
        data,
    })?;
    Ok(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_json_puts_status_first() {
        let body = jsend_json(EnvelopeStatus::Success, &json!({})).unwrap();
        assert_eq!(body, br#"{"status":"success","data":{}}"#);
    }

    #[test]
    fn debuggable_layout_is_exact() {
        let body = debuggable_jsend_json(EnvelopeStatus::Success, &json!({})).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "{\n    \"data\": {},\n    \"status\": \"success\"\n}"
        );
    }

    #[test]
    fn debuggable_escapes_non_ascii() {
        let body = debuggable_jsend_json(
            EnvelopeStatus::Success,
            &json!({"café": "naïve 😀", "plain": "a\"b"}),
        )
        .unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.is_ascii());
        assert!(text.contains(r#""caf\u00e9": "na\u00efve \ud83d\ude00""#), "{text}");
        assert!(text.contains(r#""plain": "a\"b""#), "{text}");
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["data"]["café"], "naïve 😀");
    }

    #[test]
    fn debuggable_sorts_nested_keys() {
        let body =
            debuggable_jsend_json(EnvelopeStatus::Fail, &json!({"b": 1, "a": {"d": 2, "c": [3]}}))
                .unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
        assert!(text.find("\"c\"").unwrap() < text.find("\"d\"").unwrap());
        assert!(text.contains("\n            \"c\": [\n                3\n"));
    }

    #[test]
    fn yaml_envelope() {
        let body = jsend_yaml(EnvelopeStatus::Error, &json!("Endpoint does not exist.")).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "status: error\ndata: Endpoint does not exist.\n"
        );
    }
}

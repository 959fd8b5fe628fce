//! XML-RPC wire codec.
//!
//! Encodes method calls and decodes method responses, mapping XML-RPC values
//! onto `serde_json::Value`:
//!
//! - `<string>`, bare `<value>text</value>`, `<dateTime.iso8601>`, `<base64>`
//!   ↔ `String` (base64 content is kept encoded)
//! - `<int>` / `<i4>` / `<i8>` ↔ integer `Number`
//! - `<double>` ↔ float `Number`
//! - `<boolean>` (`0` / `1`) ↔ `Bool`
//! - `<struct>` ↔ `Object`, `<array>` ↔ `Array`, `<nil/>` ↔ `Null`

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Cursor;

use crate::error::{XenError, XenResult};

// ── Encoding ────────────────────────────────────────────────────────

/// Serialize a `<methodCall>` document.
pub fn encode_request(method: &str, params: &[Value]) -> XenResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("methodCall")))
        .map_err(encode_err)?;
    write_text_element(&mut writer, "methodName", method)?;
    writer
        .write_event(Event::Start(BytesStart::new("params")))
        .map_err(encode_err)?;
    for param in params {
        writer
            .write_event(Event::Start(BytesStart::new("param")))
            .map_err(encode_err)?;
        write_value(&mut writer, param)?;
        writer
            .write_event(Event::End(BytesEnd::new("param")))
            .map_err(encode_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("params")))
        .map_err(encode_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("methodCall")))
        .map_err(encode_err)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| XenError::protocol(format!("Encoded request is not UTF-8: {e}")))
}

/// Write one `<value>...</value>` element (recursive for structs and arrays).
fn write_value<W: std::io::Write>(writer: &mut Writer<W>, value: &Value) -> XenResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("value")))
        .map_err(encode_err)?;

    match value {
        Value::Null => {
            writer
                .write_event(Event::Empty(BytesStart::new("nil")))
                .map_err(encode_err)?;
        }
        Value::Bool(b) => {
            write_text_element(writer, "boolean", if *b { "1" } else { "0" })?;
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                write_text_element(writer, "int", &i.to_string())?;
            } else {
                write_text_element(writer, "double", &n.to_string())?;
            }
        }
        Value::String(s) => {
            write_text_element(writer, "string", s)?;
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new("array")))
                .map_err(encode_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("data")))
                .map_err(encode_err)?;
            for item in items {
                write_value(writer, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("data")))
                .map_err(encode_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("array")))
                .map_err(encode_err)?;
        }
        Value::Object(members) => {
            writer
                .write_event(Event::Start(BytesStart::new("struct")))
                .map_err(encode_err)?;
            for (name, member) in members {
                writer
                    .write_event(Event::Start(BytesStart::new("member")))
                    .map_err(encode_err)?;
                write_text_element(writer, "name", name)?;
                write_value(writer, member)?;
                writer
                    .write_event(Event::End(BytesEnd::new("member")))
                    .map_err(encode_err)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("struct")))
                .map_err(encode_err)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("value")))
        .map_err(encode_err)?;
    Ok(())
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> XenResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(encode_err)?;
    if !text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(encode_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(encode_err)?;
    Ok(())
}

fn encode_err(e: impl fmt::Display) -> XenError {
    XenError::protocol(format!("XML-RPC encode error: {e}"))
}

// ── Decoding ────────────────────────────────────────────────────────

/// Parse a `<methodResponse>` document and return its single parameter.
///
/// An entirely empty body decodes to `Value::Null`. A `<fault>` element is
/// surfaced as a remote error carrying `faultCode` / `faultString`.
pub fn decode_response(xml: &str) -> XenResult<Value> {
    if xml.trim().is_empty() {
        return Ok(Value::Null);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fault" => in_fault = true,
                b"value" => {
                    let value = read_value(&mut reader)?;
                    return if in_fault { Err(fault_error(&value)) } else { Ok(value) };
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"value" => {
                // <value/> is an empty string per XML-RPC
                return if in_fault {
                    Err(fault_error(&Value::Null))
                } else {
                    Ok(Value::String(String::new()))
                };
            }
            Ok(Event::Eof) => return Err(XenError::protocol("Response carries no value")),
            Err(e) => return Err(read_err(&reader, e)),
            _ => {}
        }
    }
}

/// Read the contents of a `<value>` element, consuming its closing tag.
fn read_value(reader: &mut Reader<&[u8]>) -> XenResult<Value> {
    let mut result: Option<Value> = None;
    loop {
        match reader.read_event() {
            // Untyped <value>text</value> is a string
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| XenError::protocol(format!("Invalid text content: {e}")))?;
                result = Some(Value::String(text.into_owned()));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                result = Some(Value::String(text));
            }
            Ok(Event::Start(ref e)) => {
                let value = match e.name().as_ref() {
                    b"string" | b"dateTime.iso8601" | b"base64" => {
                        Value::String(read_element_text(reader, e)?)
                    }
                    b"int" | b"i4" | b"i8" => {
                        let text = read_element_text(reader, e)?;
                        let n = text.trim().parse::<i64>().map_err(|_| {
                            XenError::protocol(format!("Invalid integer value: {text:?}"))
                        })?;
                        Value::from(n)
                    }
                    b"double" => {
                        let text = read_element_text(reader, e)?;
                        let f = text.trim().parse::<f64>().map_err(|_| {
                            XenError::protocol(format!("Invalid double value: {text:?}"))
                        })?;
                        serde_json::Number::from_f64(f)
                            .map(Value::Number)
                            .ok_or_else(|| XenError::protocol("Non-finite double value"))?
                    }
                    b"boolean" => {
                        let text = read_element_text(reader, e)?;
                        match text.trim() {
                            "1" | "true" => Value::Bool(true),
                            "0" | "false" => Value::Bool(false),
                            other => {
                                return Err(XenError::protocol(format!(
                                    "Invalid boolean value: {other:?}"
                                )))
                            }
                        }
                    }
                    b"struct" => read_struct(reader)?,
                    b"array" => read_array(reader)?,
                    b"nil" => {
                        read_element_text(reader, e)?;
                        Value::Null
                    }
                    other => {
                        return Err(XenError::protocol(format!(
                            "Unexpected element <{}> in value",
                            String::from_utf8_lossy(other)
                        )))
                    }
                };
                result = Some(value);
            }
            Ok(Event::Empty(ref e)) => {
                let value = match e.name().as_ref() {
                    b"nil" => Value::Null,
                    b"string" | b"dateTime.iso8601" | b"base64" => Value::String(String::new()),
                    b"struct" => Value::Object(Map::new()),
                    b"array" => Value::Array(Vec::new()),
                    other => {
                        return Err(XenError::protocol(format!(
                            "Unexpected element <{}> in value",
                            String::from_utf8_lossy(other)
                        )))
                    }
                };
                result = Some(value);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"value" => {
                // An empty <value></value> is an empty string
                return Ok(result.unwrap_or_else(|| Value::String(String::new())));
            }
            Ok(Event::Eof) => {
                return Err(XenError::protocol("Unexpected end of document inside value"))
            }
            Err(e) => return Err(read_err(reader, e)),
            _ => {}
        }
    }
}

/// Read the members of a `<struct>`, consuming its closing tag.
fn read_struct(reader: &mut Reader<&[u8]>) -> XenResult<Value> {
    let mut members = Map::new();
    let mut name: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"member" => name = None,
                b"name" => name = Some(read_element_text(reader, e)?),
                b"value" => {
                    let value = read_value(reader)?;
                    let key = name
                        .take()
                        .ok_or_else(|| XenError::protocol("Struct member value before name"))?;
                    members.insert(key, value);
                }
                other => {
                    return Err(XenError::protocol(format!(
                        "Unexpected element <{}> in struct",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"value" => {
                let key = name
                    .take()
                    .ok_or_else(|| XenError::protocol("Struct member value before name"))?;
                members.insert(key, Value::String(String::new()));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"struct" => {
                return Ok(Value::Object(members))
            }
            // </member>; </name> and </value> are consumed by their readers
            Ok(Event::End(_)) => {}
            Ok(Event::Eof) => {
                return Err(XenError::protocol("Unexpected end of document inside struct"))
            }
            Err(e) => return Err(read_err(reader, e)),
            _ => {}
        }
    }
}

/// Read the items of an `<array>`, consuming its closing tag.
fn read_array(reader: &mut Reader<&[u8]>) -> XenResult<Value> {
    let mut items = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"data" => {}
                b"value" => items.push(read_value(reader)?),
                other => {
                    return Err(XenError::protocol(format!(
                        "Unexpected element <{}> in array",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"value" => {
                items.push(Value::String(String::new()));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"array" => {
                return Ok(Value::Array(items))
            }
            // </data>
            Ok(Event::End(_)) => {}
            Ok(Event::Eof) => {
                return Err(XenError::protocol("Unexpected end of document inside array"))
            }
            Err(e) => return Err(read_err(reader, e)),
            _ => {}
        }
    }
}

fn read_element_text(reader: &mut Reader<&[u8]>, start: &BytesStart) -> XenResult<String> {
    reader
        .read_text(start.name())
        .map(|text| text.into_owned())
        .map_err(|e| read_err(reader, e))
}

fn read_err(reader: &Reader<&[u8]>, e: impl fmt::Display) -> XenError {
    XenError::protocol(format!(
        "XML error at position {}: {}",
        reader.buffer_position(),
        e
    ))
}

fn fault_error(value: &Value) -> XenError {
    let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or_default();
    let message = value
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown fault");
    XenError::remote(format!("XML-RPC fault {code}: {message}"))
}

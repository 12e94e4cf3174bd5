//! Length-prefixed envelope codec.
//!
//! Frame layout, one WebSocket text message per frame:
//!
//! ```text
//! <8-digit zero-padded header length><JSON header><body>
//! ```
//!
//! The header length is counted in UTF-16 code units, which is what JavaScript
//! peers report as a string's length. The body runs to the end of the message,
//! so no delimiter is needed. Headers longer than `99_999_999` units cannot be
//! represented.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::{Result, WsMinerError};

/// Width of the decimal length prefix.
pub const PRELUDE_LENGTH: usize = 8;

/// Header key carrying the body encoding.
pub const BODY_TYPE: &str = "bodyType";

/// Untyped envelope header.
pub type Header = Map<String, Value>;

/// Body encoding tag stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Body is JSON text.
    Json,
    /// Body is used verbatim.
    String,
}

impl BodyType {
    pub fn as_str(self) -> &'static str {
        match self {
            BodyType::Json => "json",
            BodyType::String => "string",
        }
    }

    /// Anything other than `"json"` (including a missing tag) means verbatim.
    fn from_header(header: &Header) -> Self {
        match header.get(BODY_TYPE).and_then(Value::as_str) {
            Some("json") => BodyType::Json,
            _ => BodyType::String,
        }
    }
}

/// Envelope body: an opaque string or a structured JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    pub fn body_type(&self) -> BodyType {
        match self {
            Body::Json(_) => BodyType::Json,
            Body::Text(_) => BodyType::String,
        }
    }

    fn encode(&self) -> Cow<'_, str> {
        match self {
            Body::Json(v) => Cow::Owned(v.to_string()),
            Body::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_owned())
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Json(v)
    }
}

/// One decoded (header, body) pair. `header` always carries `bodyType`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub header: Header,
    pub body: Body,
}

impl Envelope {
    /// Header `type` field, if present.
    pub fn msg_type(&self) -> Option<&str> {
        self.header.get("type").and_then(Value::as_str)
    }
}

/// Encode a frame. `bodyType` is derived from `body` and overrides any
/// caller-supplied value.
pub fn serialize(header: &Header, body: &Body) -> String {
    let mut header = header.clone();
    header.insert(
        BODY_TYPE.to_owned(),
        Value::String(body.body_type().as_str().to_owned()),
    );
    let encoded_header = Value::Object(header).to_string();
    let encoded_body = body.encode();

    let mut frame =
        String::with_capacity(PRELUDE_LENGTH + encoded_header.len() + encoded_body.len());
    frame.push_str(&format!(
        "{:0width$}",
        encoded_header.encode_utf16().count(),
        width = PRELUDE_LENGTH
    ));
    frame.push_str(&encoded_header);
    frame.push_str(&encoded_body);
    frame
}

/// Decode a frame produced by [`serialize`].
pub fn deserialize(frame: &str) -> Result<Envelope> {
    let prelude = frame.get(..PRELUDE_LENGTH).ok_or_else(|| {
        WsMinerError::MalformedLength(format!("missing {PRELUDE_LENGTH}-digit length prefix"))
    })?;
    if !prelude.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WsMinerError::MalformedLength(format!(
            "{prelude:?} is not a decimal length"
        )));
    }
    let header_len: usize = prelude
        .parse()
        .map_err(|e| WsMinerError::MalformedLength(format!("{prelude:?}: {e}")))?;

    let rest = frame.get(PRELUDE_LENGTH..).unwrap_or_default();
    let header_end = utf16_offset(rest, header_len).ok_or_else(|| {
        WsMinerError::MalformedHeader(format!(
            "header length {header_len} does not fit the frame"
        ))
    })?;
    let (raw_header, raw_body) = rest.split_at(header_end);

    let header = match serde_json::from_str::<Value>(raw_header) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(WsMinerError::MalformedHeader(format!(
                "header must be a JSON object, got {other}"
            )))
        }
        Err(e) => return Err(WsMinerError::MalformedHeader(e.to_string())),
    };

    let body = match BodyType::from_header(&header) {
        BodyType::Json => Body::Json(
            serde_json::from_str(raw_body)
                .map_err(|e| WsMinerError::MalformedBody(e.to_string()))?,
        ),
        BodyType::String => Body::Text(raw_body.to_owned()),
    };

    Ok(Envelope { header, body })
}

/// Byte offset just past the first `units` UTF-16 code units of `s`.
/// `None` if `s` is shorter or the offset would split a surrogate pair.
fn utf16_offset(s: &str, units: usize) -> Option<usize> {
    let mut seen = 0;
    for (i, c) in s.char_indices() {
        if seen == units {
            return Some(i);
        }
        seen += c.len_utf16();
        if seen > units {
            return None;
        }
    }
    (seen == units).then_some(s.len())
}

#[cfg(test)]
mod tests {
    use super::utf16_offset;

    #[test]
    fn utf16_offsets_follow_code_units() {
        assert_eq!(utf16_offset("abc", 0), Some(0));
        assert_eq!(utf16_offset("abc", 3), Some(3));
        assert_eq!(utf16_offset("abc", 4), None);
        // é: 2 bytes, 1 unit
        assert_eq!(utf16_offset("éx", 1), Some(2));
        // 😀: 4 bytes, 2 units
        assert_eq!(utf16_offset("😀x", 2), Some(4));
        assert_eq!(utf16_offset("😀x", 1), None);
    }
}

//! Typed tunnel messages.
//!
//! Each header `type` maps to one `Message` variant carrying exactly the
//! fields that type requires. Conversion to and from [`Envelope`] checks those
//! fields at decode time, so handlers never look at an untyped header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, WsMinerError};
use crate::protocol::envelope::{self, Body, Envelope, Header};
use crate::protocol::headers::WireHeaders;

const TYPE: &str = "type";
const REQUEST_ID: &str = "requestId";
const CHUNK_ENCODING: &str = "chunkEncoding";
const BASE64: &str = "base64";

/// Header `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Connection,
    Open,
    RequestStart,
    RequestData,
    RequestEnd,
    ResponseStart,
    ResponseData,
    ResponseEnd,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Connection => "connection",
            MessageType::Open => "open",
            MessageType::RequestStart => "request-start",
            MessageType::RequestData => "request-data",
            MessageType::RequestEnd => "request-end",
            MessageType::ResponseStart => "response-start",
            MessageType::ResponseData => "response-data",
            MessageType::ResponseEnd => "response-end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "connection" => MessageType::Connection,
            "open" => MessageType::Open,
            "request-start" => MessageType::RequestStart,
            "request-data" => MessageType::RequestData,
            "request-end" => MessageType::RequestEnd,
            "response-start" => MessageType::ResponseStart,
            "response-data" => MessageType::ResponseData,
            "response-end" => MessageType::ResponseEnd,
            _ => return None,
        })
    }
}

/// Body of `request-start`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestHead {
    /// Path and query relative to the upstream root.
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: WireHeaders,
}

impl RequestHead {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("url".into(), Value::String(self.url.clone()));
        map.insert("method".into(), Value::String(self.method.clone()));
        map.insert("headers".into(), self.headers.to_json());
        Value::Object(map)
    }
}

/// Body of `response-start`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseHead {
    pub code: u16,
    /// Reason phrase; informational only.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub headers: WireHeaders,
}

impl ResponseHead {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("code".into(), Value::from(self.code));
        map.insert("status".into(), Value::String(self.status.clone()));
        map.insert("headers".into(), self.headers.to_json());
        Value::Object(map)
    }
}

/// One tunnel message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// relay -> miner: public base URL for this tunnel.
    Connection { url: String },
    /// miner -> relay: miner session announcement.
    Open { session_id: String },
    RequestStart { request_id: String, head: RequestHead },
    RequestData { request_id: String, chunk: Bytes },
    RequestEnd { request_id: String },
    ResponseStart { request_id: String, head: ResponseHead },
    ResponseData { request_id: String, chunk: Bytes },
    ResponseEnd { request_id: String },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Connection { .. } => MessageType::Connection,
            Message::Open { .. } => MessageType::Open,
            Message::RequestStart { .. } => MessageType::RequestStart,
            Message::RequestData { .. } => MessageType::RequestData,
            Message::RequestEnd { .. } => MessageType::RequestEnd,
            Message::ResponseStart { .. } => MessageType::ResponseStart,
            Message::ResponseData { .. } => MessageType::ResponseData,
            Message::ResponseEnd { .. } => MessageType::ResponseEnd,
        }
    }

    /// Correlation id, for every variant scoped to one exchange.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Message::Connection { .. } | Message::Open { .. } => None,
            Message::RequestStart { request_id, .. }
            | Message::RequestData { request_id, .. }
            | Message::RequestEnd { request_id }
            | Message::ResponseStart { request_id, .. }
            | Message::ResponseData { request_id, .. }
            | Message::ResponseEnd { request_id } => Some(request_id),
        }
    }

    /// Encode as one frame.
    pub fn encode(&self) -> String {
        let env = self.to_envelope();
        envelope::serialize(&env.header, &env.body)
    }

    /// Decode one frame.
    pub fn decode(frame: &str) -> Result<Self> {
        Self::from_envelope(envelope::deserialize(frame)?)
    }

    pub fn to_envelope(&self) -> Envelope {
        let mut header = Header::new();
        header.insert(
            TYPE.into(),
            Value::String(self.message_type().as_str().to_owned()),
        );
        if let Some(id) = self.request_id() {
            header.insert(REQUEST_ID.into(), Value::String(id.to_owned()));
        }

        let body = match self {
            Message::Connection { url } => Body::Text(url.clone()),
            Message::Open { session_id } => Body::Text(session_id.clone()),
            Message::RequestStart { head, .. } => Body::Json(head.to_json()),
            Message::ResponseStart { head, .. } => Body::Json(head.to_json()),
            Message::RequestData { chunk, .. } | Message::ResponseData { chunk, .. } => {
                encode_chunk(&mut header, chunk)
            }
            Message::RequestEnd { .. } | Message::ResponseEnd { .. } => Body::Text(String::new()),
        };

        Envelope { header, body }
    }

    pub fn from_envelope(env: Envelope) -> Result<Self> {
        let raw_type = env
            .msg_type()
            .ok_or_else(|| WsMinerError::InvalidMessage("missing type".into()))?;
        let msg_type = MessageType::parse(raw_type)
            .ok_or_else(|| WsMinerError::UnknownType(raw_type.to_owned()))?;

        match msg_type {
            MessageType::Connection => Ok(Message::Connection {
                url: text_body(env.body, msg_type)?,
            }),
            MessageType::Open => Ok(Message::Open {
                session_id: text_body(env.body, msg_type)?,
            }),
            MessageType::RequestStart => Ok(Message::RequestStart {
                request_id: request_id(&env.header, msg_type)?,
                head: json_body(env.body, msg_type)?,
            }),
            MessageType::ResponseStart => Ok(Message::ResponseStart {
                request_id: request_id(&env.header, msg_type)?,
                head: json_body(env.body, msg_type)?,
            }),
            MessageType::RequestData => Ok(Message::RequestData {
                request_id: request_id(&env.header, msg_type)?,
                chunk: decode_chunk(&env.header, env.body)?,
            }),
            MessageType::ResponseData => Ok(Message::ResponseData {
                request_id: request_id(&env.header, msg_type)?,
                chunk: decode_chunk(&env.header, env.body)?,
            }),
            MessageType::RequestEnd => Ok(Message::RequestEnd {
                request_id: request_id(&env.header, msg_type)?,
            }),
            MessageType::ResponseEnd => Ok(Message::ResponseEnd {
                request_id: request_id(&env.header, msg_type)?,
            }),
        }
    }
}

fn request_id(header: &Header, ty: MessageType) -> Result<String> {
    header
        .get(REQUEST_ID)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| WsMinerError::InvalidMessage(format!("{} without requestId", ty.as_str())))
}

fn text_body(body: Body, ty: MessageType) -> Result<String> {
    match body {
        Body::Text(s) | Body::Json(Value::String(s)) => Ok(s),
        Body::Json(other) => Err(WsMinerError::InvalidMessage(format!(
            "{} expects a string body, got {other}",
            ty.as_str()
        ))),
    }
}

fn json_body<T: DeserializeOwned>(body: Body, ty: MessageType) -> Result<T> {
    let Body::Json(value) = body else {
        return Err(WsMinerError::InvalidMessage(format!(
            "{} expects a json body",
            ty.as_str()
        )));
    };
    serde_json::from_value(value)
        .map_err(|e| WsMinerError::InvalidMessage(format!("{}: {e}", ty.as_str())))
}

/// UTF-8 chunks travel verbatim; anything else is base64 and tagged.
fn encode_chunk(header: &mut Header, chunk: &Bytes) -> Body {
    match std::str::from_utf8(chunk) {
        Ok(s) => Body::Text(s.to_owned()),
        Err(_) => {
            header.insert(CHUNK_ENCODING.into(), Value::String(BASE64.into()));
            Body::Text(STANDARD.encode(chunk))
        }
    }
}

fn decode_chunk(header: &Header, body: Body) -> Result<Bytes> {
    let base64 = header.get(CHUNK_ENCODING).and_then(Value::as_str) == Some(BASE64);
    match body {
        Body::Text(s) if base64 => STANDARD
            .decode(s.as_bytes())
            .map(Bytes::from)
            .map_err(|e| WsMinerError::InvalidMessage(format!("chunk is not base64: {e}"))),
        Body::Text(s) => Ok(Bytes::from(s)),
        Body::Json(value) => buffer_json(&value),
    }
}

/// `{"type":"Buffer","data":[..]}`: how Node peers JSON-encode raw chunks.
fn buffer_json(value: &Value) -> Result<Bytes> {
    let invalid = || WsMinerError::InvalidMessage("chunk body is not a byte buffer".into());
    if value.get("type").and_then(Value::as_str) != Some("Buffer") {
        return Err(invalid());
    }
    let data = value.get("data").and_then(Value::as_array).ok_or_else(invalid)?;
    data.iter()
        .map(|b| {
            b.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(invalid)
        })
        .collect::<Result<Vec<u8>>>()
        .map(Bytes::from)
}

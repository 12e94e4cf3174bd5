#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bytes::Bytes;
use serde_json::json;

use wsminer_core::protocol::envelope::{deserialize, serialize, Body};
use wsminer_core::protocol::{Message, MessageType, RequestHead, ResponseHead, WireHeaders};

fn frame(header: serde_json::Value, body: Body) -> String {
    let serde_json::Value::Object(h) = header else { panic!("object") };
    serialize(&h, &body)
}

#[test]
fn request_start_encodes_head_as_json() {
    let mut headers = WireHeaders::new();
    headers.insert("Accept", "text/html");
    let msg = Message::RequestStart {
        request_id: "r1".into(),
        head: RequestHead {
            url: "/hello?x=1".into(),
            method: "GET".into(),
            headers,
        },
    };

    let env = deserialize(&msg.encode()).unwrap();
    assert_eq!(env.header["type"], json!("request-start"));
    assert_eq!(env.header["requestId"], json!("r1"));
    assert_eq!(env.header["bodyType"], json!("json"));
    assert_eq!(
        env.body,
        Body::Json(json!({ "url": "/hello?x=1", "method": "GET", "headers": { "accept": "text/html" } }))
    );

    assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
}

#[test]
fn response_start_accepts_repeated_headers() {
    let raw = frame(
        json!({ "type": "response-start", "requestId": "r2" }),
        Body::Json(json!({
            "code": 201,
            "status": "Created",
            "headers": { "set-cookie": ["a=1", "b=2"], "content-type": "text/plain" }
        })),
    );

    let Message::ResponseStart { request_id, head } = Message::decode(&raw).unwrap() else {
        panic!("expected response-start");
    };
    assert_eq!(request_id, "r2");
    assert_eq!(head.code, 201);
    let http = head.headers.to_http();
    let cookies: Vec<_> = http.get_all("set-cookie").iter().collect();
    assert_eq!(cookies.len(), 2);
    assert_eq!(http["content-type"], "text/plain");
}

#[test]
fn utf8_chunks_travel_as_plain_strings() {
    let msg = Message::ResponseData {
        request_id: "r3".into(),
        chunk: Bytes::from_static(b"hello 42"),
    };
    let encoded = msg.encode();
    assert!(encoded.ends_with("hello 42"));
    assert!(!encoded.contains("chunkEncoding"));
    assert_eq!(Message::decode(&encoded).unwrap(), msg);
}

#[test]
fn binary_chunks_are_base64_tagged() {
    let chunk = Bytes::from_static(&[0xff, 0x00, 0xfe, 0x10]);
    let msg = Message::RequestData {
        request_id: "r4".into(),
        chunk: chunk.clone(),
    };
    let env = deserialize(&msg.encode()).unwrap();
    assert_eq!(env.header["chunkEncoding"], json!("base64"));
    assert_eq!(env.body, Body::Text("/wD+EA==".into()));

    let Message::RequestData { chunk: decoded, .. } = Message::decode(&msg.encode()).unwrap() else {
        panic!("expected request-data");
    };
    assert_eq!(decoded, chunk);
}

#[test]
fn node_buffer_chunks_are_understood() {
    let raw = frame(
        json!({ "type": "request-data", "requestId": "r5" }),
        Body::Json(json!({ "type": "Buffer", "data": [104, 105] })),
    );
    let Message::RequestData { chunk, .. } = Message::decode(&raw).unwrap() else {
        panic!("expected request-data");
    };
    assert_eq!(chunk, Bytes::from_static(b"hi"));
}

#[test]
fn end_messages_carry_empty_string_body() {
    let msg = Message::ResponseEnd { request_id: "r6".into() };
    let env = deserialize(&msg.encode()).unwrap();
    assert_eq!(env.body, Body::Text(String::new()));
    assert_eq!(msg.message_type(), MessageType::ResponseEnd);
    assert_eq!(msg.request_id(), Some("r6"));
}

#[test]
fn connection_and_open_have_no_request_id() {
    let conn = Message::Connection { url: "http://host:9000/abc123/".into() };
    let env = deserialize(&conn.encode()).unwrap();
    assert!(env.header.get("requestId").is_none());
    assert_eq!(Message::decode(&conn.encode()).unwrap(), conn);

    let open = Message::Open { session_id: "s1".into() };
    assert_eq!(open.request_id(), None);
    assert_eq!(Message::decode(&open.encode()).unwrap(), open);
}

#[test]
fn unknown_type_is_reported_separately() {
    let raw = frame(json!({ "type": "request-abort", "requestId": "r7" }), Body::from(""));
    let err = Message::decode(&raw).unwrap_err();
    assert_eq!(err.code().as_str(), "UNKNOWN_TYPE");
    assert!(err.is_decode_error());
}

#[test]
fn missing_request_id_is_invalid() {
    let raw = frame(json!({ "type": "response-data" }), Body::from("chunk"));
    let err = Message::decode(&raw).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_MESSAGE");
}

#[test]
fn request_start_with_string_body_is_invalid() {
    let raw = frame(json!({ "type": "request-start", "requestId": "r8" }), Body::from("/hello"));
    let err = Message::decode(&raw).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_MESSAGE");
}

#[test]
fn response_head_defaults_missing_status_and_headers() {
    let raw = frame(
        json!({ "type": "response-start", "requestId": "r9" }),
        Body::Json(json!({ "code": 204 })),
    );
    let Message::ResponseStart { head, .. } = Message::decode(&raw).unwrap() else {
        panic!("expected response-start");
    };
    assert_eq!(
        head,
        ResponseHead { code: 204, status: String::new(), headers: WireHeaders::new() }
    );
}

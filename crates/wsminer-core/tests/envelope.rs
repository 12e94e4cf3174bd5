#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::{json, Value};

use wsminer_core::protocol::envelope::{deserialize, serialize, Body, Header, PRELUDE_LENGTH};

fn header(v: Value) -> Header {
    match v {
        Value::Object(map) => map,
        _ => panic!("header must be an object"),
    }
}

#[test]
fn json_body_round_trips_with_body_type() {
    let h = header(json!({ "type": "response-start", "requestId": "r1" }));
    let body = Body::Json(json!({ "code": 200, "status": "OK", "headers": { "x-n": ["1", "2"] } }));

    let env = deserialize(&serialize(&h, &body)).unwrap();

    let mut expected = h.clone();
    expected.insert("bodyType".into(), json!("json"));
    assert_eq!(env.header, expected);
    assert_eq!(env.body, body);
}

#[test]
fn string_body_is_sent_verbatim() {
    let h = header(json!({ "type": "response-data", "requestId": "r1" }));
    let frame = serialize(&h, &Body::from("{\"looks\": \"like json\"}"));

    assert!(frame.ends_with("{\"looks\": \"like json\"}"));
    let env = deserialize(&frame).unwrap();
    assert_eq!(env.header["bodyType"], json!("string"));
    assert_eq!(env.body, Body::Text("{\"looks\": \"like json\"}".into()));
}

#[test]
fn json_string_body_keeps_its_quotes() {
    let h = header(json!({ "type": "open" }));
    let frame = serialize(&h, &Body::Json(json!("123")));
    let env = deserialize(&frame).unwrap();
    assert_eq!(env.body, Body::Json(json!("123")));
}

#[test]
fn prefix_is_zero_padded_header_length() {
    let h = header(json!({ "type": "request-end", "requestId": "abc" }));
    let frame = serialize(&h, &Body::from("12345678"));

    let encoded_header = &frame[PRELUDE_LENGTH..frame.len() - "12345678".len()];
    assert_eq!(
        &frame[..PRELUDE_LENGTH],
        format!("{:08}", encoded_header.encode_utf16().count())
    );
    assert!(serde_json::from_str::<Value>(encoded_header).unwrap().is_object());
    assert_eq!(deserialize(&frame).unwrap().body, Body::Text("12345678".into()));
}

#[test]
fn caller_body_type_is_overridden() {
    let h = header(json!({ "type": "open", "bodyType": "json" }));
    let env = deserialize(&serialize(&h, &Body::from("not json"))).unwrap();
    assert_eq!(env.header["bodyType"], json!("string"));
    assert_eq!(env.body, Body::Text("not json".into()));
}

#[test]
fn multibyte_header_length_counts_utf16_units() {
    let h = header(json!({ "type": "connection", "who": "ünïcödé 😀" }));
    let frame = serialize(&h, &Body::from("ok ✓"));

    let encoded_header = &frame[PRELUDE_LENGTH..frame.len() - "ok ✓".len()];
    assert_eq!(encoded_header.len() - encoded_header.encode_utf16().count(), 6);
    assert_eq!(
        &frame[..PRELUDE_LENGTH],
        format!("{:08}", encoded_header.encode_utf16().count())
    );

    let env = deserialize(&frame).unwrap();
    assert_eq!(env.header["who"], json!("ünïcödé 😀"));
    assert_eq!(env.body, Body::Text("ok ✓".into()));
}

#[test]
fn decodes_frames_from_node_peers() {
    // JSON.stringify(header).length is 52 here; the UTF-8 length is 53
    let frame = r#"00000052{"type":"connection","note":"é","bodyType":"string"}http://h/"#;
    let env = deserialize(frame).unwrap();
    assert_eq!(env.header["note"], json!("é"));
    assert_eq!(env.body, Body::Text("http://h/".into()));
}

#[test]
fn length_splitting_a_surrogate_pair_is_rejected() {
    let frame = r#"00000010{"a":"😀"}x"#;
    assert_eq!(deserialize(frame).unwrap().body, Body::Text("x".into()));

    let split = r#"00000007{"a":"😀"}x"#;
    assert_eq!(deserialize(split).unwrap_err().code().as_str(), "MALFORMED_HEADER");
}

#[test]
fn malformed_length_gives_no_partial_result() {
    let err = deserialize("abcdefgh{}").unwrap_err();
    assert_eq!(err.code().as_str(), "MALFORMED_LENGTH");
    assert!(err.is_decode_error());
}

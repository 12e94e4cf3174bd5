//! Envelope codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use serde_json::Value;

use wsminer_core::protocol::envelope::{deserialize, Body};

use vector_loader::TestVector;

fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

#[test]
fn envelope_vectors() {
    let files = [
        "request_start.json",
        "digits_in_body.json",
        "unicode_header.json",
        "node_accented_header.json",
        "astral_header.json",
        "unknown_body_type.json",
        "empty_body.json",
        "length_not_digits.json",
        "length_signed.json",
        "too_short.json",
        "header_not_json.json",
        "header_not_object.json",
        "header_overflow.json",
        "body_not_json.json",
    ];

    for f in files {
        let v = load(f);
        let frame = v.frame.decode();
        let res = deserialize(&frame);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(
            Value::Object(env.header.clone()),
            ex["header"],
            "vector={}",
            v.description
        );

        match ex["body_type"].as_str().unwrap() {
            "json" => assert_eq!(env.body, Body::Json(ex["body"].clone()), "vector={}", v.description),
            "string" => assert_eq!(
                env.body,
                Body::Text(ex["body"].as_str().unwrap().to_owned()),
                "vector={}",
                v.description
            ),
            other => panic!("unknown body_type {other}"),
        }
    }
}

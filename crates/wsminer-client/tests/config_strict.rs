#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use wsminer_client::config::{self, Args};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
miner:
  upstream: "http://localhost:3000"
  upsteam: "http://localhost:3001" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_full_config() {
    let cfg = config::load_from_str(
        r#"
version: 1
miner:
  upstream: "http://localhost:3000"
  downstream: "wss://relay.example.com"
  exchange_timeout_ms: 5000
"#,
    )
    .expect("must parse");

    let s = cfg.miner.settings().unwrap();
    assert_eq!(s.upstream, "http://localhost:3000");
    assert_eq!(s.downstream, "wss://relay.example.com");
    assert_eq!(s.exchange_timeout, Duration::from_millis(5000));
    assert_eq!(s.max_buffered_chunks, 64);
}

#[test]
fn rejects_unknown_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn rejects_wrong_schemes() {
    let err = config::load_from_str("version: 1\nminer:\n  upstream: \"ws://localhost:3000\"\n")
        .expect_err("upstream must be http");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");

    let err = config::load_from_str("version: 1\nminer:\n  downstream: \"http://relay\"\n")
        .expect_err("downstream must be ws");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn rejects_out_of_range_buffers() {
    let err = config::load_from_str("version: 1\nminer:\n  max_buffered_chunks: 0\n")
        .expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn flags_alone_are_enough() {
    let args = Args {
        upstream: Some("http://127.0.0.1:8080".into()),
        downstream: Some("ws://127.0.0.1:9000".into()),
        config: None,
    };
    let s = config::resolve(&args).unwrap();
    assert_eq!(s.upstream, "http://127.0.0.1:8080");
    assert_eq!(s.downstream, "ws://127.0.0.1:9000");
}

#[test]
fn both_endpoints_are_required() {
    let args = Args {
        upstream: Some("http://127.0.0.1:8080".into()),
        downstream: None,
        config: None,
    };
    let err = config::resolve(&args).expect_err("must fail");
    assert!(err.to_string().contains("--downstream"));
}

#[test]
fn flags_override_file() {
    let path = std::env::temp_dir().join(format!("wsminer-client-{}.yaml", std::process::id()));
    std::fs::write(
        &path,
        "version: 1\nminer:\n  upstream: \"http://file:1\"\n  downstream: \"ws://file:2\"\n",
    )
    .unwrap();

    let args = Args {
        upstream: Some("http://flag:3".into()),
        downstream: None,
        config: Some(path.clone()),
    };
    let s = config::resolve(&args).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(s.upstream, "http://flag:3");
    assert_eq!(s.downstream, "ws://file:2");
}

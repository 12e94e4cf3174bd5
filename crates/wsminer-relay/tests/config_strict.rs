#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use wsminer_relay::config::{self, Args};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
relay:
  listen: "0.0.0.0:9000"
  ping_intervl_ms: 1000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.relay.listen, "0.0.0.0:9000");
    assert!(cfg.relay.public_url.is_none());
}

#[test]
fn rejects_unknown_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn idle_timeout_must_exceed_ping_interval() {
    let bad = r#"
version: 1
relay:
  ping_interval_ms: 30000
  idle_timeout_ms: 20000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn public_url_needs_http_scheme() {
    let bad = r#"
version: 1
relay:
  public_url: "tunnel.example.com"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn port_flag_overrides_listen_port() {
    let cfg = config::resolve(&Args { port: Some(9100), config: None }).unwrap();
    assert_eq!(cfg.relay.listen, "0.0.0.0:9100");
}

#[test]
fn port_is_required_without_config_file() {
    let err = config::resolve(&Args { port: None, config: None }).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

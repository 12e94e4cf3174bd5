//! Decode-once codec for tunnel sockets.
//!
//! - Text frames => typed `Message`
//! - Binary frames are not part of the protocol and are surfaced for logging
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message as WsMessage;
use wsminer_core::{error::Result, protocol::Message};

#[derive(Debug)]
pub enum Inbound {
    Envelope(Message),
    Binary { bytes_len: usize },
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: WsMessage) -> Result<Inbound> {
    match msg {
        WsMessage::Text(s) => Ok(Inbound::Envelope(Message::decode(&s)?)),
        WsMessage::Binary(b) => Ok(Inbound::Binary { bytes_len: b.len() }),
        WsMessage::Ping(v) => Ok(Inbound::Ping(v)),
        WsMessage::Pong(_) => Ok(Inbound::Pong),
        WsMessage::Close(_) => Ok(Inbound::Close),
    }
}

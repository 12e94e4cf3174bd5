//! Decode-once codec for the miner's relay socket.

use tokio_tungstenite::tungstenite::Message as WsMessage;
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
        // raw frames are only produced when writing
        WsMessage::Frame(f) => Ok(Inbound::Binary { bytes_len: f.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frames_decode_to_messages() {
        let frame = Message::RequestEnd { request_id: "r1".into() }.encode();
        match decode(WsMessage::Text(frame)).unwrap() {
            Inbound::Envelope(Message::RequestEnd { request_id }) => assert_eq!(request_id, "r1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_text_is_a_decode_error() {
        let err = decode(WsMessage::Text("hello".into())).unwrap_err();
        assert!(err.is_decode_error());
    }
}

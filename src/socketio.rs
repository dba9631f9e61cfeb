//! Text-frame codec for Socket.IO v5 over Engine.IO v4.
//!
//! Each websocket text frame is one Engine.IO packet: a single type digit
//! followed by an optional body. Engine.IO `message` packets (`4`) carry a
//! Socket.IO packet, whose own type digit comes next:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,..}   engine open
//! 2 / 3                                     engine ping / pong
//! 40 / 40{"sid":".."}                       socket connect
//! 41                                        socket disconnect
//! 42["document",{..}]                       socket event
//! 4212["message",{..}]                      socket event with ack id 12
//! ```
//!
//! Binary attachments and acknowledgements are not used by the backend and
//! are rejected as unsupported.

use serde::{Deserialize, Serialize};

use crate::error::WandError;

/// Engine.IO handshake sent by the server in the `open` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect { sid: Option<String> },
    Disconnect,
    Event {
        name: String,
        payload: serde_json::Value,
        ack: Option<u64>,
    },
    ConnectError(String),
}

/// Decode one websocket text frame.
pub fn decode(frame: &str) -> Result<Packet, WandError> {
    let mut chars = frame.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| WandError::packet(frame, "empty frame"))?;
    let body = chars.as_str();

    match engine_type {
        '0' => serde_json::from_str(body)
            .map(Packet::Open)
            .map_err(|e| WandError::packet(frame, format!("bad handshake: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(frame, body),
        '6' => Ok(Packet::Noop),
        other => Err(WandError::packet(
            frame,
            format!("unsupported engine packet type '{other}'"),
        )),
    }
}

fn decode_socket(frame: &str, body: &str) -> Result<Packet, WandError> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| WandError::packet(frame, "message packet without socket type"))?;
    let rest = skip_namespace(chars.as_str());

    match socket_type {
        '0' => {
            if rest.is_empty() {
                return Ok(Packet::Connect { sid: None });
            }
            #[derive(Deserialize)]
            struct ConnectBody {
                sid: Option<String>,
            }
            let parsed: ConnectBody = serde_json::from_str(rest)
                .map_err(|e| WandError::packet(frame, format!("bad connect body: {e}")))?;
            Ok(Packet::Connect { sid: parsed.sid })
        }
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(frame, rest),
        '4' => {
            let detail = serde_json::from_str::<serde_json::Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(detail))
        }
        other => Err(WandError::packet(
            frame,
            format!("unsupported socket packet type '{other}'"),
        )),
    }
}

/// Strip a `/namespace,` prefix. Only the default namespace is in use, so
/// the name itself is discarded.
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn decode_event(frame: &str, rest: &str) -> Result<Packet, WandError> {
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let ack = if digits > 0 {
        Some(
            rest[..digits]
                .parse::<u64>()
                .map_err(|e| WandError::packet(frame, format!("bad ack id: {e}")))?,
        )
    } else {
        None
    };

    let args: Vec<serde_json::Value> = serde_json::from_str(&rest[digits..])
        .map_err(|e| WandError::packet(frame, format!("event body is not an array: {e}")))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(serde_json::Value::String(name)) => name,
        _ => return Err(WandError::packet(frame, "event name must be a string")),
    };
    let payload = args.next().unwrap_or(serde_json::Value::Null);

    Ok(Packet::Event { name, payload, ack })
}

/// Encode a packet as a websocket text frame.
pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(handshake) => {
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        Packet::Close => "1".to_string(),
        Packet::Ping => "2".to_string(),
        Packet::Pong => "3".to_string(),
        Packet::Noop => "6".to_string(),
        Packet::Connect { sid: None } => "40".to_string(),
        Packet::Connect { sid: Some(sid) } => {
            format!("40{}", serde_json::json!({ "sid": sid }))
        }
        Packet::Disconnect => "41".to_string(),
        Packet::Event { name, payload, ack } => {
            let args = serde_json::json!([name, payload]);
            match ack {
                Some(id) => format!("42{id}{args}"),
                None => format!("42{args}"),
            }
        }
        Packet::ConnectError(message) => {
            format!("44{}", serde_json::json!({ "message": message }))
        }
    }
}

/// Shorthand for an outbound event frame.
pub fn event_frame(name: &str, payload: serde_json::Value) -> String {
    encode(&Packet::Event {
        name: name.to_string(),
        payload,
        ack: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_handshake() {
        let frame = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match decode(frame).unwrap() {
            Packet::Open(h) => {
                assert_eq!(h.sid, "abc");
                assert_eq!(h.ping_interval, 25000);
                assert_eq!(h.ping_timeout, 20000);
                assert_eq!(h.max_payload, Some(1_000_000));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_ping_pong_noop_close() {
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("3").unwrap(), Packet::Pong);
        assert_eq!(decode("6").unwrap(), Packet::Noop);
        assert_eq!(decode("1").unwrap(), Packet::Close);
    }

    #[test]
    fn test_decode_connect_with_and_without_sid() {
        assert_eq!(decode("40").unwrap(), Packet::Connect { sid: None });
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect { sid: Some("xyz".into()) }
        );
    }

    #[test]
    fn test_decode_event() {
        let frame = r#"42["kill_session",{"id":"s1"}]"#;
        assert_eq!(
            decode(frame).unwrap(),
            Packet::Event {
                name: "kill_session".into(),
                payload: json!({"id": "s1"}),
                ack: None,
            }
        );
    }

    #[test]
    fn test_decode_event_with_ack_id() {
        match decode(r#"4217["message",{"id":"s1","message":"hi"}]"#).unwrap() {
            Packet::Event { name, ack, .. } => {
                assert_eq!(name, "message");
                assert_eq!(ack, Some(17));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_in_namespace() {
        match decode(r#"42/wand,["document",{}]"#).unwrap() {
            Packet::Event { name, .. } => assert_eq!(name, "document"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_without_payload_is_null() {
        match decode(r#"42["ping_me"]"#).unwrap() {
            Packet::Event { payload, .. } => assert!(payload.is_null()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_connect_error_message() {
        assert_eq!(
            decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError("Not authorized".into())
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("9").is_err());
        assert!(decode("4").is_err());
        assert!(decode("42{not an array}").is_err());
        assert!(decode("42[1, 2]").is_err());
        assert!(decode(r#"451-["document",{"_placeholder":true,"num":0}]"#).is_err());
    }

    #[test]
    fn test_encode_outbound_chat_event() {
        let frame = event_frame("chat_message", json!({"message": "hi", "code": "c", "id": "s"}));
        assert!(frame.starts_with("42[\"chat_message\","));
        assert_eq!(
            decode(&frame).unwrap(),
            Packet::Event {
                name: "chat_message".into(),
                payload: json!({"message": "hi", "code": "c", "id": "s"}),
                ack: None,
            }
        );
    }

    #[test]
    fn test_encode_control_packets() {
        assert_eq!(encode(&Packet::Connect { sid: None }), "40");
        assert_eq!(encode(&Packet::Disconnect), "41");
        assert_eq!(encode(&Packet::Pong), "3");
    }
}

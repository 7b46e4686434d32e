//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound client frame: `{"type": ..., "room": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    RoomMessage {
        room: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Outbound envelope for room broadcasts.
#[derive(Debug, Clone, Serialize)]
pub struct RoomBroadcast<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: RoomBroadcastPayload<'a>,
}

/// Payload of a room broadcast: the room, the sender, and their message.
#[derive(Debug, Clone, Serialize)]
pub struct RoomBroadcastPayload<'a> {
    pub room: &'a str,
    pub from: &'a str,
    pub message: &'a Value,
}

impl<'a> RoomBroadcast<'a> {
    pub fn new(room: &'a str, from: &'a str, message: &'a Value) -> Self {
        Self {
            kind: "room_message",
            payload: RoomBroadcastPayload {
                room,
                from,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(r#"{"type":"join_room","room":"dice"}"#, ClientFrame::JoinRoom { room: "dice".to_string() })]
    #[case(r#"{"type":"leave_room","room":"dice"}"#, ClientFrame::LeaveRoom { room: "dice".to_string() })]
    fn client_frames_deserialize(#[case] raw: &str, #[case] expected: ClientFrame) {
        let frame: ClientFrame = serde_json::from_str(raw).expect("valid frame");
        assert_eq!(frame, expected);
    }

    #[test]
    fn room_message_defaults_to_null_payload() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"room_message","room":"dice"}"#).expect("valid frame");
        assert_eq!(
            frame,
            ClientFrame::RoomMessage {
                room: "dice".to_string(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn unknown_frame_types_are_rejected() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn broadcast_envelope_shape() {
        let message = json!({"text": "rolled a 3"});
        let broadcast = RoomBroadcast::new("dice", "user-1", &message);
        let encoded = serde_json::to_value(&broadcast).expect("serialize");
        assert_eq!(encoded["type"], "room_message");
        assert_eq!(encoded["payload"]["room"], "dice");
        assert_eq!(encoded["payload"]["from"], "user-1");
        assert_eq!(encoded["payload"]["message"]["text"], "rolled a 3");
    }
}

//! `buoyproto`: the wire protocol spoken between the swarm and a buoy server.
//!
//! Frames are newline-delimited JSON. A call carries a client-assigned `seq`
//! that the server echoes on its reply; at most one reply per seq. Method
//! payloads are plain structs so call sites stay typed; reply bodies arrive
//! as `serde_json::Value` and are viewed through the typed reply structs
//! below only where the harness actually inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod decor;

pub const REQ_JOIN: &str = "join";
pub const REQ_FETCH_ROOMS: &str = "fetchRooms";
pub const REQ_JOIN_ROOM: &str = "joinRoom";
pub const REQ_SET_PROFILE: &str = "setProfile";
pub const REQ_SEND_CHAT: &str = "sendChat";

/// Client -> server. `params` is omitted on the wire for zero-argument
/// methods such as `fetchRooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFrame {
    pub seq: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Server -> client, correlated by `seq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub seq: u64,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinParams {
    pub credential: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRoomParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub decoration: String,
    pub handle: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetProfileParams {
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendChatParams {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinReply {
    #[serde(default)]
    pub error: bool,
    #[serde(rename = "peerId")]
    pub peer_id: Option<String>,
}

/// One entry of the ordered room list returned by `fetchRooms`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomEntry {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomReply {
    #[serde(default)]
    pub error: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_frame_skips_null_params() {
        let f = CallFrame {
            seq: 3,
            name: REQ_FETCH_ROOMS.to_string(),
            params: Value::Null,
        };
        let s = serde_json::to_string(&f).unwrap();
        assert_eq!(s, r#"{"seq":3,"name":"fetchRooms"}"#);

        let back: CallFrame = serde_json::from_str(&s).unwrap();
        assert_eq!(back.seq, 3);
        assert!(back.params.is_null());
    }

    #[test]
    fn join_reply_reads_peer_id_and_defaults_error() {
        let r: JoinReply = serde_json::from_str(r#"{"peerId":"p-17"}"#).unwrap();
        assert!(!r.error);
        assert_eq!(r.peer_id.as_deref(), Some("p-17"));

        let r: JoinReply = serde_json::from_str(r#"{"error":true}"#).unwrap();
        assert!(r.error);
        assert!(r.peer_id.is_none());
    }

    #[test]
    fn join_room_reply_carries_server_message() {
        let r: JoinRoomReply =
            serde_json::from_str(r#"{"error":true,"message":"room is full"}"#).unwrap();
        assert!(r.error);
        assert_eq!(r.message.as_deref(), Some("room is full"));
    }

    #[test]
    fn room_list_preserves_server_order() {
        let rooms: Vec<RoomEntry> =
            serde_json::from_str(r#"[{"id":"b"},{"id":"a"},{"id":"c"}]"#).unwrap();
        let ids = rooms.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}

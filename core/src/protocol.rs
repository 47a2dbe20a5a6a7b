use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};

use crate::snapshot::StateSnapshot;

fn default_delay_seconds() -> u64 {
    5
}

/// Administrative notice pushed over the stream shortly before a server
/// restart or deploy. Receiving one is terminal for the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    pub message: String,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
}

/// One inbound push-stream payload. The two shapes share a channel and are
/// told apart by the `type` discriminant; anything without it is a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Snapshot(StateSnapshot),
    ServerUpdate(ServerUpdate),
}

impl<'de> Deserialize<'de> for StreamMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("type").and_then(serde_json::Value::as_str) == Some("server_update") {
            let update = ServerUpdate::deserialize(value).map_err(DeError::custom)?;
            return Ok(StreamMessage::ServerUpdate(update));
        }
        let snapshot = StateSnapshot::deserialize(value).map_err(DeError::custom)?;
        Ok(StreamMessage::Snapshot(snapshot))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OkReply {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDoubleTile {
    pub row: u32,
    pub col: u32,
}

/// A near-win notice: the same word arrived moments after someone else won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseCall {
    pub delta_ms: u64,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessReply {
    pub status: String,
    #[serde(rename = "pointsDelta", default)]
    pub points_delta: f64,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub over: bool,
    #[serde(default)]
    pub daily_double: bool,
    #[serde(default)]
    pub daily_double_available: bool,
    #[serde(default)]
    pub daily_double_tile: Option<DailyDoubleTile>,
    #[serde(default)]
    pub close_call: Option<CloseCall>,
    /// The server echoes the post-guess state so the caller can apply it
    /// without waiting for the next poll.
    #[serde(default)]
    pub state: Option<StateSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintReply {
    pub status: String,
    pub row: u32,
    pub col: u32,
    pub letter: String,
    #[serde(default)]
    pub daily_double_available: bool,
}

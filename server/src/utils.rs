use shared::{ServerMessage, ServerPayload, StatusLevel};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Current time in whole seconds, used for token expiry
pub fn get_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

// Wrap a payload in a fresh envelope
pub fn outgoing(payload: ServerPayload) -> ServerMessage {
    ServerMessage {
        id: Uuid::new_v4().to_string(),
        timestamp: get_timestamp(),
        payload,
    }
}

pub fn status(level: StatusLevel, content: impl Into<String>) -> ServerMessage {
    outgoing(ServerPayload::status(level, content))
}

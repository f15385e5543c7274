use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db_types::{ChatRoom, ProfileId};

pub const MATCH_SUCCESS_EVENT: &str = "match_success";
pub const WAITER_EXPIRED_EVENT: &str = "waiter_expired";

/// The wire shape handed to the real-time transport for delivery to one user's connection(s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Emitted once per successful pairing, after the chat room has been persisted. Carries both participants so the
/// transport can fan the notification out to each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSuccessEvent {
    pub chat_room: ChatRoom,
    pub user_id: ProfileId,
    pub waiter_id: ProfileId,
}

impl MatchSuccessEvent {
    pub fn new(chat_room: ChatRoom, user_id: ProfileId, waiter_id: ProfileId) -> Self {
        Self { chat_room, user_id, waiter_id }
    }

    pub fn recipients(&self) -> [&ProfileId; 2] {
        [&self.user_id, &self.waiter_id]
    }

    /// One `match_success` notification per recipient, carrying the new room's id.
    pub fn notifications(&self) -> Vec<(ProfileId, Notification)> {
        let notification = Notification {
            event_type: MATCH_SUCCESS_EVENT.to_string(),
            payload: json!({ "chatRoomId": self.chat_room.id }),
        };
        self.recipients().into_iter().map(|id| (id.clone(), notification.clone())).collect()
    }
}

/// Emitted when the scheduler removes a waiter whose client went silent, so the transport can tell a reconnecting
/// waiter that their offer lapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiterExpiredEvent {
    pub profile_id: ProfileId,
    pub last_heartbeat: DateTime<Utc>,
}

impl WaiterExpiredEvent {
    pub fn notification(&self) -> Notification {
        Notification {
            event_type: WAITER_EXPIRED_EVENT.to_string(),
            payload: json!({ "lastHeartbeat": self.last_heartbeat.to_rfc3339() }),
        }
    }
}

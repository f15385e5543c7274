use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------     ProfileId       ---------------------------------------------------------
/// A lightweight wrapper around the platform's profile identifier.
#[derive(Clone, Debug, Type, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProfileId(pub String);

impl Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ProfileId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl ProfileId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

//--------------------------------------     RoleName        ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
#[error("'{0}' is not a valid role name")]
pub struct InvalidRoleName(String);

/// A role string ("listener", "psychologist", ...). Role names are stored lowercase; whether a role is actually
/// eligible for matching is decided at runtime against the role directory, not here.
#[derive(Clone, Debug, Type, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct RoleName(String);

impl Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoleName {
    type Err = InvalidRoleName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(InvalidRoleName(s.to_string()));
        }
        Ok(Self(name))
    }
}

impl RoleName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        value.parse().expect("invalid role name literal")
    }
}

//--------------------------------------    WaiterStatus     ---------------------------------------------------------
/// Waiter availability. `Idle` is represented by the *absence* of a registry entry; entries only ever hold
/// `Working` or `Busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaiterStatus {
    Idle,
    Working,
    Busy,
}

impl Display for WaiterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaiterStatus::Idle => write!(f, "idle"),
            WaiterStatus::Working => write!(f, "working"),
            WaiterStatus::Busy => write!(f, "busy"),
        }
    }
}

//--------------------------------------    WaiterEntry      ---------------------------------------------------------
/// In-memory record of a waiter currently offering support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiterEntry {
    pub profile_id: ProfileId,
    /// Roles this waiter currently offers. Non-empty; every member passed the permission and matchable-set filters
    /// when the entry was created.
    pub roles: BTreeSet<RoleName>,
    pub status: WaiterStatus,
    pub last_heartbeat: DateTime<Utc>,
    /// When the entry became `Working`. Drives the longest-available-first pairing policy.
    pub available_since: DateTime<Utc>,
}

impl WaiterEntry {
    pub fn working(profile_id: ProfileId, roles: BTreeSet<RoleName>, now: DateTime<Utc>) -> Self {
        Self { profile_id, roles, status: WaiterStatus::Working, last_heartbeat: now, available_since: now }
    }

    pub fn offers(&self, role: &RoleName) -> bool {
        self.roles.contains(role)
    }
}

//--------------------------------------   UserQueueEntry    ---------------------------------------------------------
/// In-memory record of a user waiting to be paired with a waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQueueEntry {
    pub profile_id: ProfileId,
    pub requested_role: RoleName,
    pub started_at: DateTime<Utc>,
}

//--------------------------------------    QueueStatus      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub in_queue: bool,
    pub requested_role: Option<RoleName>,
    /// 0-based FIFO slot, for queue-progress display.
    pub position: Option<usize>,
}

impl QueueStatus {
    pub fn not_queued() -> Self {
        Self { in_queue: false, requested_role: None, position: None }
    }
}

//--------------------------------------   MatchingFlags     ---------------------------------------------------------
/// The persisted shadow of a profile's in-memory availability. Best-effort mirror used only for reconnect/restart
/// recovery; in-memory state wins while the process is alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingFlags {
    pub is_matching: bool,
    pub matching_roles: Vec<RoleName>,
}

//--------------------------------------  ProfileSnapshot    ---------------------------------------------------------
/// The slice of a persisted profile that the recovery coordinator consults when a connection (re)opens.
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    pub id: ProfileId,
    pub is_matching: bool,
    pub matching_roles: Vec<RoleName>,
    pub permissions: Vec<RoleName>,
}

//--------------------------------------      RoomType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
pub enum RoomType {
    PrivateSupport,
    PrivateTherapy,
    GroupSupport,
    GroupTherapy,
}

impl Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomType::PrivateSupport => write!(f, "private-chat-for-support"),
            RoomType::PrivateTherapy => write!(f, "private-chat-for-therapy"),
            RoomType::GroupSupport => write!(f, "group-chat-for-support"),
            RoomType::GroupTherapy => write!(f, "group-chat-for-therapy"),
        }
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private-chat-for-support" => Ok(RoomType::PrivateSupport),
            "private-chat-for-therapy" => Ok(RoomType::PrivateTherapy),
            "group-chat-for-support" => Ok(RoomType::GroupSupport),
            "group-chat-for-therapy" => Ok(RoomType::GroupTherapy),
            _ => Err(format!("Unknown room type: {s}")),
        }
    }
}

impl From<String> for RoomType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            log::error!("🗃️ {e}. Defaulting to private support session");
            RoomType::PrivateSupport
        })
    }
}

//--------------------------------------     RoomStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
pub enum RoomStatus {
    Active,
    Archived,
}

impl Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomStatus::Active => write!(f, "active"),
            RoomStatus::Archived => write!(f, "archived"),
        }
    }
}

impl From<String> for RoomStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => RoomStatus::Active,
            "archived" => RoomStatus::Archived,
            other => {
                log::error!("🗃️ Unknown room status: {other}. Defaulting to active");
                RoomStatus::Active
            },
        }
    }
}

//--------------------------------------       RoomId        ---------------------------------------------------------
#[derive(Clone, Debug, Type, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct RoomId(pub String);

impl Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for RoomId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

//--------------------------------------    NewChatRoom      ---------------------------------------------------------
pub const SUPPORT_SESSION_NAME: &str = "Private Support Session";

/// A chat room record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewChatRoom {
    pub name: String,
    pub participant_ids: Vec<ProfileId>,
    pub owner_id: ProfileId,
    pub room_type: RoomType,
    pub status: RoomStatus,
}

impl NewChatRoom {
    /// The room created when a match succeeds: a private support session between the requesting user (who owns the
    /// room) and the waiter.
    pub fn support_session(user_id: ProfileId, waiter_id: ProfileId) -> Self {
        Self {
            name: SUPPORT_SESSION_NAME.to_string(),
            participant_ids: vec![user_id.clone(), waiter_id],
            owner_id: user_id,
            room_type: RoomType::PrivateSupport,
            status: RoomStatus::Active,
        }
    }
}

//--------------------------------------      ChatRoom       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: RoomId,
    pub name: String,
    pub participant_ids: Vec<ProfileId>,
    pub owner_id: ProfileId,
    pub room_type: RoomType,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

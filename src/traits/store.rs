use std::future::Future;

use thiserror::Error;

use crate::db_types::{ChatRoom, MatchingFlags, NewChatRoom, ProfileId, RoleName};

#[derive(Debug, Clone, Error)]
pub enum MatchingStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

impl From<sqlx::Error> for MatchingStoreError {
    fn from(e: sqlx::Error) -> Self {
        MatchingStoreError::DatabaseError(e.to_string())
    }
}

/// Read access to the permission system's role records, restricted to what the matching engine needs: the names of
/// the roles currently flagged as matchable. Role CRUD itself lives outside the engine.
///
/// These methods are written as desugared async functions with a `Send` bound on the returned future, because the
/// scheduler drives them from a task spawned onto the multithreaded runtime. Implementations can still use plain
/// `async fn`.
pub trait RoleCatalog {
    fn fetch_matchable_roles(&self) -> impl Future<Output = Result<Vec<RoleName>, MatchingStoreError>> + Send;
}

/// Write-through access to a profile's persisted matching flags.
///
/// The flags are a best-effort mirror of the in-memory availability state, consulted only at recovery time. A
/// backend should treat `set_matching_flags` as a plain column update on the profile row.
pub trait ProfileStateStore {
    fn set_matching_flags(
        &self,
        profile_id: &ProfileId,
        is_matching: bool,
        roles: &[RoleName],
    ) -> impl Future<Output = Result<(), MatchingStoreError>> + Send;

    fn fetch_matching_flags(
        &self,
        profile_id: &ProfileId,
    ) -> impl Future<Output = Result<MatchingFlags, MatchingStoreError>> + Send;
}

/// Creation of the persistent chat room record for a successful pairing.
pub trait ChatRoomStore {
    fn insert_support_room(&self, room: NewChatRoom) -> impl Future<Output = Result<ChatRoom, MatchingStoreError>> + Send;
}

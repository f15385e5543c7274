use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
        PoisonError,
    },
};

use chrono::Utc;

use crate::{
    db_types::{ChatRoom, MatchingFlags, NewChatRoom, ProfileId, RoleName},
    traits::{ChatRoomStore, MatchingStoreError, ProfileStateStore, RoleCatalog},
};

/// An in-memory storage backend that records every write, with one-shot failure injection for exercising the
/// engine's store-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    matchable: Mutex<Vec<RoleName>>,
    flags: Mutex<BTreeMap<ProfileId, MatchingFlags>>,
    rooms: Mutex<Vec<ChatRoom>>,
    next_room: AtomicU64,
    fail_fetch: AtomicBool,
    fail_room_insert: AtomicBool,
}

impl MemoryStore {
    pub fn add_matchable_roles(&self, names: &[&str]) {
        let mut matchable = self.matchable.lock().unwrap_or_else(PoisonError::into_inner);
        matchable.extend(names.iter().map(|n| RoleName::from(*n)));
    }

    /// The next `fetch_matchable_roles` call fails.
    pub fn fail_next_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    /// The next `insert_support_room` call fails.
    pub fn fail_next_room_insert(&self) {
        self.fail_room_insert.store(true, Ordering::SeqCst);
    }

    /// The last flags written through for the given profile, if any.
    pub fn flags_for(&self, profile_id: &ProfileId) -> Option<(bool, Vec<RoleName>)> {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.get(profile_id).map(|f| (f.is_matching, f.matching_roles.clone()))
    }

    pub fn rooms(&self) -> Vec<ChatRoom> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl RoleCatalog for MemoryStore {
    async fn fetch_matchable_roles(&self) -> Result<Vec<RoleName>, MatchingStoreError> {
        if self.fail_fetch.swap(false, Ordering::SeqCst) {
            return Err(MatchingStoreError::DatabaseError("injected role fetch failure".to_string()));
        }
        Ok(self.matchable.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl ProfileStateStore for MemoryStore {
    async fn set_matching_flags(
        &self,
        profile_id: &ProfileId,
        is_matching: bool,
        roles: &[RoleName],
    ) -> Result<(), MatchingStoreError> {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.insert(profile_id.clone(), MatchingFlags { is_matching, matching_roles: roles.to_vec() });
        Ok(())
    }

    async fn fetch_matching_flags(&self, profile_id: &ProfileId) -> Result<MatchingFlags, MatchingStoreError> {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.get(profile_id).cloned().ok_or_else(|| MatchingStoreError::ProfileNotFound(profile_id.to_string()))
    }
}

impl ChatRoomStore for MemoryStore {
    async fn insert_support_room(&self, room: NewChatRoom) -> Result<ChatRoom, MatchingStoreError> {
        if self.fail_room_insert.swap(false, Ordering::SeqCst) {
            return Err(MatchingStoreError::DatabaseError("injected room insert failure".to_string()));
        }
        let n = self.next_room.fetch_add(1, Ordering::SeqCst);
        let stored = ChatRoom {
            id: format!("room-{n}").into(),
            name: room.name,
            participant_ids: room.participant_ids,
            owner_id: room.owner_id,
            room_type: room.room_type,
            status: room.status,
            created_at: Utc::now(),
        };
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).push(stored.clone());
        Ok(stored)
    }
}

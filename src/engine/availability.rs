//! The in-memory availability state: waiters currently offering support and users waiting to be paired.
//!
//! Everything in here is pure, synchronous state manipulation. The registry owns the only mutable shared state in
//! the engine; [`crate::MatchingApi`] keeps it behind a single mutex that is never held across an await, which is
//! what makes the check-then-act sequences below atomic with respect to the scheduler's pairing pass.
use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{ProfileId, QueueStatus, RoleName, UserQueueEntry, WaiterEntry, WaiterStatus},
    engine::MatchingError,
};

/// A pairing produced by the matching pass. The waiter has already been flipped to `Busy` and the user removed from
/// the queue by the time a `MatchPair` leaves the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub user: UserQueueEntry,
    pub waiter_id: ProfileId,
}

#[derive(Debug, Default)]
pub struct AvailabilityRegistry {
    waiters: BTreeMap<ProfileId, WaiterEntry>,
    queue: VecDeque<UserQueueEntry>,
}

impl AvailabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most one entry per profile; `Working` and `Busy` both count as already working.
    pub fn insert_waiter(&mut self, entry: WaiterEntry) -> Result<(), MatchingError> {
        if self.waiters.contains_key(&entry.profile_id) {
            return Err(MatchingError::AlreadyWorking);
        }
        self.waiters.insert(entry.profile_id.clone(), entry);
        Ok(())
    }

    pub fn remove_waiter(&mut self, profile_id: &ProfileId) -> Option<WaiterEntry> {
        self.waiters.remove(profile_id)
    }

    /// Refreshes the liveness timestamp. Returns false (and does nothing) when the waiter has no entry; status is
    /// never changed by a heartbeat.
    pub fn touch_waiter(&mut self, profile_id: &ProfileId, now: DateTime<Utc>) -> bool {
        match self.waiters.get_mut(profile_id) {
            Some(entry) => {
                entry.last_heartbeat = now;
                true
            },
            None => false,
        }
    }

    /// Idle is the absence of an entry.
    pub fn waiter_status(&self, profile_id: &ProfileId) -> WaiterStatus {
        self.waiters.get(profile_id).map(|e| e.status).unwrap_or(WaiterStatus::Idle)
    }

    pub fn waiter_roles(&self, profile_id: &ProfileId) -> Vec<RoleName> {
        self.waiters.get(profile_id).map(|e| e.roles.iter().cloned().collect()).unwrap_or_default()
    }

    /// Working waiters currently offering the given role.
    pub fn available_count(&self, role: &RoleName) -> usize {
        self.waiters.values().filter(|w| w.status == WaiterStatus::Working && w.offers(role)).count()
    }

    pub fn enqueue(&mut self, entry: UserQueueEntry) -> Result<(), MatchingError> {
        if self.queue.iter().any(|u| u.profile_id == entry.profile_id) {
            return Err(MatchingError::AlreadyQueued);
        }
        self.queue.push_back(entry);
        Ok(())
    }

    pub fn dequeue(&mut self, profile_id: &ProfileId) -> Option<UserQueueEntry> {
        let idx = self.queue.iter().position(|u| &u.profile_id == profile_id)?;
        self.queue.remove(idx)
    }

    pub fn queue_status(&self, profile_id: &ProfileId) -> QueueStatus {
        match self.queue.iter().position(|u| &u.profile_id == profile_id) {
            Some(idx) => QueueStatus {
                in_queue: true,
                requested_role: self.queue.get(idx).map(|u| u.requested_role.clone()),
                position: Some(idx),
            },
            None => QueueStatus::not_queued(),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Removes every waiter whose last heartbeat is older than `cutoff` and returns the removed entries. Busy
    /// waiters expire too: a paired waiter whose client died should not stay stuck busy forever.
    pub fn expire_waiters(&mut self, cutoff: DateTime<Utc>) -> Vec<WaiterEntry> {
        let stale: Vec<ProfileId> =
            self.waiters.values().filter(|w| w.last_heartbeat < cutoff).map(|w| w.profile_id.clone()).collect();
        stale.iter().filter_map(|id| self.waiters.remove(id)).collect()
    }

    /// The pairing pass. Scans the user queue in FIFO order; for each user the eligible `Working` waiter that has
    /// been available the longest wins. The waiter flips to `Busy` and the user leaves the queue before this method
    /// returns, so a waiter can never be handed to two users and an overlapping pass sees consistent state.
    pub fn take_pairs(&mut self) -> Vec<MatchPair> {
        let mut pairs = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        let waiting: VecDeque<UserQueueEntry> = std::mem::take(&mut self.queue);
        for user in waiting {
            match self.pick_waiter(&user.profile_id, &user.requested_role) {
                Some(waiter_id) => {
                    if let Some(waiter) = self.waiters.get_mut(&waiter_id) {
                        waiter.status = WaiterStatus::Busy;
                    }
                    trace!("🤝 Queued user {} paired with waiter {waiter_id}", user.profile_id);
                    pairs.push(MatchPair { user, waiter_id });
                },
                None => remaining.push_back(user),
            }
        }
        self.queue = remaining;
        pairs
    }

    /// Longest-available-first, with the profile id as a deterministic tie-break. A profile may sit in both
    /// collections at once; it is never eligible as its own waiter.
    fn pick_waiter(&self, user_id: &ProfileId, role: &RoleName) -> Option<ProfileId> {
        self.waiters
            .values()
            .filter(|w| w.status == WaiterStatus::Working && w.offers(role) && w.profile_id != *user_id)
            .min_by(|a, b| a.available_since.cmp(&b.available_since).then_with(|| a.profile_id.cmp(&b.profile_id)))
            .map(|w| w.profile_id.clone())
    }

    /// Compensation for a failed match materialization: the waiter returns to `Working` (if the entry still exists
    /// and is still `Busy`) and the user goes back to the front of the queue with the original `started_at`, so the
    /// next pass retries without losing the user's place.
    pub fn reinstate_pair(&mut self, user: UserQueueEntry, waiter_id: &ProfileId) {
        if let Some(waiter) = self.waiters.get_mut(waiter_id) {
            if waiter.status == WaiterStatus::Busy {
                waiter.status = WaiterStatus::Working;
            }
        }
        if !self.queue.iter().any(|u| u.profile_id == user.profile_id) {
            self.queue.push_front(user);
        }
    }
}

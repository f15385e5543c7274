use std::{
    collections::BTreeSet,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        NewChatRoom,
        ProfileId,
        ProfileSnapshot,
        QueueStatus,
        RoleName,
        UserQueueEntry,
        WaiterEntry,
        WaiterStatus,
    },
    engine::{availability::MatchPair, AvailabilityRegistry, MatchingError, RoleDirectory},
    events::{EventProducers, MatchSuccessEvent, WaiterExpiredEvent},
    traits::{ChatRoomStore, MatchingStoreError, ProfileStateStore, RoleCatalog},
};

/// The matching engine's public API: waiter availability, the user queue, recovery on reconnect, and the body of the
/// scheduler tick.
///
/// All in-memory state lives in one [`AvailabilityRegistry`] behind a single mutex. Every operation completes its
/// registry mutation under the lock, releases it, and only then awaits the persistence write-through. The lock is
/// never held across an await, so check-then-act sequences (duplicate checks, the `stop` decision, the pairing
/// pass's `Busy` flip) cannot interleave with each other or with the scheduler.
pub struct MatchingApi<B> {
    db: B,
    registry: Mutex<AvailabilityRegistry>,
    directory: RoleDirectory,
    producers: EventProducers,
    tick_running: AtomicBool,
}

impl<B> Debug for MatchingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchingApi")
    }
}

impl<B> MatchingApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self {
            db,
            registry: Mutex::new(AvailabilityRegistry::new()),
            directory: RoleDirectory::new(),
            producers,
            tick_running: AtomicBool::new(false),
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn registry(&self) -> MutexGuard<'_, AvailabilityRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_matchable_role(&self, role: &RoleName) -> bool {
        self.directory.contains(role)
    }

    pub fn matchable_roles(&self) -> Vec<RoleName> {
        self.directory.snapshot()
    }

    /// Working waiters currently offering `role`, for availability display.
    pub fn available_waiters(&self, role: &RoleName) -> usize {
        self.registry().available_count(role)
    }

    pub fn waiter_status(&self, profile_id: &ProfileId) -> WaiterStatus {
        self.registry().waiter_status(profile_id)
    }

    pub fn waiter_roles(&self, profile_id: &ProfileId) -> Vec<RoleName> {
        self.registry().waiter_roles(profile_id)
    }

    /// Refreshes the liveness timestamp of a working or busy waiter. Silent no-op for idle profiles.
    pub fn record_heartbeat(&self, profile_id: &ProfileId) {
        if self.registry().touch_waiter(profile_id, Utc::now()) {
            trace!("🫀 Heartbeat from waiter {profile_id}");
        }
    }

    pub fn queue_status(&self, profile_id: &ProfileId) -> QueueStatus {
        self.registry().queue_status(profile_id)
    }
}

impl<B> MatchingApi<B>
where B: RoleCatalog
{
    /// Reloads the matchable-role set. A store failure keeps the last-known-good set and never propagates: a stale
    /// directory is preferable to a crashed scheduler.
    pub async fn refresh_matchable_roles(&self) {
        match self.db.fetch_matchable_roles().await {
            Ok(roles) => {
                debug!("📇 Matchable roles refreshed: [{}]", join_roles(&roles));
                self.directory.replace(roles);
            },
            Err(e) => {
                warn!("📇 Could not refresh matchable roles, keeping the previous set: {e}");
            },
        }
    }
}

impl<B> MatchingApi<B>
where B: ProfileStateStore
{
    /// Registers a waiter as working. `requested` is filtered to the roles present in both the caller's permission
    /// set and the matchable set; the accepted roles are returned.
    pub async fn set_waiter_working(
        &self,
        profile_id: ProfileId,
        requested: Vec<RoleName>,
        caller_permissions: &[RoleName],
    ) -> Result<Vec<RoleName>, MatchingError> {
        let offered: BTreeSet<RoleName> = requested
            .into_iter()
            .filter(|r| caller_permissions.contains(r) && self.directory.contains(r))
            .collect();
        if offered.is_empty() {
            return Err(MatchingError::NoValidRoles);
        }
        let now = Utc::now();
        self.registry().insert_waiter(WaiterEntry::working(profile_id.clone(), offered.clone(), now))?;
        let accepted: Vec<RoleName> = offered.into_iter().collect();
        info!("🤝 Waiter {profile_id} is now working, offering [{}]", join_roles(&accepted));
        self.write_flags(&profile_id, true, &accepted).await;
        Ok(accepted)
    }

    /// Unconditionally returns a waiter to idle. Idempotent.
    pub async fn set_waiter_idle(&self, profile_id: &ProfileId) {
        let removed = self.registry().remove_waiter(profile_id);
        if removed.is_some() {
            info!("🤝 Waiter {profile_id} is now idle");
        }
        self.write_flags(profile_id, false, &[]).await;
    }

    /// Adds a user to the matching queue for a single requested role.
    pub async fn enqueue_user(&self, profile_id: ProfileId, requested_role: RoleName) -> Result<(), MatchingError> {
        let entry =
            UserQueueEntry { profile_id: profile_id.clone(), requested_role: requested_role.clone(), started_at: Utc::now() };
        self.registry().enqueue(entry)?;
        info!("🤝 User {profile_id} queued for a {requested_role}");
        self.write_flags(&profile_id, true, std::slice::from_ref(&requested_role)).await;
        Ok(())
    }

    /// Removes a user from the queue if present.
    pub async fn dequeue_user(&self, profile_id: &ProfileId) {
        if self.registry().dequeue(profile_id).is_some() {
            info!("🤝 User {profile_id} left the matching queue");
        }
        self.write_flags(profile_id, false, &[]).await;
    }

    /// Stops matching for a queued user. The presence check and the removal happen under one lock acquisition, with
    /// no suspension point in between: a concurrent pairing pass can therefore never remove the entry after this
    /// method has decided the user is still queued.
    pub async fn stop_matching(&self, profile_id: &ProfileId) -> Result<(), MatchingError> {
        match self.registry().dequeue(profile_id) {
            Some(_) => {},
            None => return Err(MatchingError::NotInQueue),
        }
        info!("🤝 User {profile_id} stopped matching");
        self.write_flags(profile_id, false, &[]).await;
        Ok(())
    }

    /// Re-derives in-memory availability from the persisted matching flags when a connection (re)opens, so that a
    /// server restart or client reconnect does not lose "in queue" / "working" status. Keyed check-before-insert
    /// makes repeated calls idempotent.
    pub fn restore_state(&self, profile: &ProfileSnapshot) {
        if !profile.is_matching {
            return;
        }
        let now = Utc::now();
        let is_waiter = profile.permissions.iter().any(|p| self.directory.contains(p));
        let mut registry = self.registry();
        if is_waiter {
            if registry.waiter_status(&profile.id) != WaiterStatus::Idle {
                return;
            }
            let roles: BTreeSet<RoleName> =
                profile.matching_roles.iter().filter(|r| self.directory.contains(r)).cloned().collect();
            if roles.is_empty() {
                debug!("🧭 No recognized waiter roles to restore for {}", profile.id);
                return;
            }
            if registry.insert_waiter(WaiterEntry::working(profile.id.clone(), roles, now)).is_ok() {
                info!("🧭 Restored working state for waiter {}", profile.id);
            }
        } else {
            if registry.queue_status(&profile.id).in_queue {
                return;
            }
            match profile.matching_roles.first() {
                Some(role) if self.directory.contains(role) => {
                    let entry = UserQueueEntry {
                        profile_id: profile.id.clone(),
                        requested_role: role.clone(),
                        started_at: now,
                    };
                    if registry.enqueue(entry).is_ok() {
                        info!("🧭 Restored queue position for user {} ({role})", profile.id);
                    }
                },
                _ => debug!("🧭 No recognized requested role to restore for {}", profile.id),
            }
        }
    }

    /// Best-effort write-through of the persisted matching flags. Failures are logged, never propagated: the flags
    /// are a recovery mirror, and in-memory state is authoritative while the process is alive.
    async fn write_flags(&self, profile_id: &ProfileId, is_matching: bool, roles: &[RoleName]) {
        if let Err(e) = self.db.set_matching_flags(profile_id, is_matching, roles).await {
            match e {
                MatchingStoreError::ProfileNotFound(_) => {
                    warn!("🗃️ Skipped matching-flag write-through: {e}");
                },
                _ => error!("🗃️ Matching-flag write-through failed for {profile_id}: {e}"),
            }
        }
    }
}

impl<B> MatchingApi<B>
where B: ProfileStateStore + ChatRoomStore
{
    /// One scheduler pass: expire silent waiters, then pair queued users with available waiters and materialize each
    /// pairing. Re-entrancy guarded; an overlapping invocation returns immediately so a waiter can never be handed
    /// out twice by two concurrent passes.
    pub async fn run_tick(&self, heartbeat_timeout: Duration) {
        if self.tick_running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            trace!("🕰️ Previous matching pass still running, skipping this tick");
            return;
        }
        self.expire_stale_waiters(heartbeat_timeout).await;
        let pairs = self.registry().take_pairs();
        for pair in pairs {
            self.create_match(pair).await;
        }
        self.tick_running.store(false, Ordering::SeqCst);
    }

    async fn expire_stale_waiters(&self, heartbeat_timeout: Duration) {
        let cutoff = Utc::now() - heartbeat_timeout;
        let expired = self.registry().expire_waiters(cutoff);
        for entry in expired {
            warn!(
                "🕰️ Waiter {} expired after missed heartbeats (last seen {})",
                entry.profile_id, entry.last_heartbeat
            );
            self.write_flags(&entry.profile_id, false, &[]).await;
            let event = WaiterExpiredEvent { profile_id: entry.profile_id, last_heartbeat: entry.last_heartbeat };
            for producer in &self.producers.waiter_expired_producers {
                producer.publish_event(event.clone()).await;
            }
        }
    }

    /// Materializes a pairing: persists the chat room, clears both persisted flags and notifies both parties. If the
    /// room insert fails, both sides are reinstated (waiter back to `Working`, user back to the head of the queue)
    /// so the next tick retries.
    async fn create_match(&self, pair: MatchPair) {
        let MatchPair { user, waiter_id } = pair;
        let user_id = user.profile_id.clone();
        let room = NewChatRoom::support_session(user_id.clone(), waiter_id.clone());
        match self.db.insert_support_room(room).await {
            Ok(room) => {
                info!("🤝 Matched user {user_id} with waiter {waiter_id} in room {}", room.id);
                self.write_flags(&user_id, false, &[]).await;
                self.write_flags(&waiter_id, false, &[]).await;
                let event = MatchSuccessEvent::new(room, user_id, waiter_id);
                for producer in &self.producers.match_success_producers {
                    producer.publish_event(event.clone()).await;
                }
            },
            Err(e) => {
                error!("🤝 Could not create a chat room for user {user_id} and waiter {waiter_id}: {e}. Reinstating both.");
                self.registry().reinstate_pair(user, &waiter_id);
            },
        }
    }
}

fn join_roles(roles: &[RoleName]) -> String {
    roles.iter().map(RoleName::to_string).collect::<Vec<String>>().join(", ")
}

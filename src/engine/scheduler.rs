use std::sync::Arc;

use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

use crate::{
    engine::MatchingApi,
    traits::{ChatRoomStore, ProfileStateStore, RoleCatalog},
};

/// How often the scheduler wakes to expire stale waiters and attempt pairings.
pub const DEFAULT_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// A waiter is considered gone after this much heartbeat silence. Tolerates roughly three missed beats at the
/// client's 30 second interval.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::seconds(90);

/// Starts the matching scheduler. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The matchable-role directory is loaded once before the first tick. A tick never panics and a failed pass never
/// aborts the timer; store failures inside a tick are logged and the next tick simply runs again.
pub fn start_matching_worker<B>(
    api: Arc<MatchingApi<B>>,
    tick_interval: std::time::Duration,
    heartbeat_timeout: Duration,
) -> JoinHandle<()>
where
    B: RoleCatalog + ProfileStateStore + ChatRoomStore + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("🕰️ Matching scheduler started (tick every {tick_interval:?}, heartbeat timeout {heartbeat_timeout})");
        api.refresh_matchable_roles().await;
        let mut timer = tokio::time::interval(tick_interval);
        loop {
            timer.tick().await;
            api.run_tick(heartbeat_timeout).await;
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{db_types::RoleName, events::EventProducers, test_utils::MemoryStore};

    #[tokio::test]
    async fn worker_loads_the_role_directory_before_ticking() {
        let _ = env_logger::try_init();
        let store = MemoryStore::default();
        store.add_matchable_roles(&["listener"]);
        let api = Arc::new(MatchingApi::new(store, EventProducers::default()));
        assert!(api.matchable_roles().is_empty());

        let handle = start_matching_worker(Arc::clone(&api), std::time::Duration::from_millis(10), DEFAULT_HEARTBEAT_TIMEOUT);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(api.matchable_roles(), vec![RoleName::from("listener")]);
        handle.abort();
    }

    // The worker is generic over the backend, so the spawned tick must be able to cross threads.
    #[tokio::test(flavor = "multi_thread")]
    async fn worker_pairs_on_a_multithreaded_runtime() {
        let store = MemoryStore::default();
        store.add_matchable_roles(&["listener"]);
        let api = Arc::new(MatchingApi::new(store, EventProducers::default()));

        let handle = start_matching_worker(Arc::clone(&api), std::time::Duration::from_millis(10), DEFAULT_HEARTBEAT_TIMEOUT);
        for _ in 0..50 {
            if !api.matchable_roles().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        api.set_waiter_working("w1".into(), vec!["listener".into()], &["listener".into()]).await.unwrap();
        api.enqueue_user("u1".into(), "listener".into()).await.unwrap();
        for _ in 0..50 {
            if !api.db().rooms().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(api.db().rooms().len(), 1);
        assert!(!api.queue_status(&"u1".into()).in_queue);
    }
}

use chrono::Duration;
use futures_util::FutureExt;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use support_match_engine::{
    db_types::{ProfileId, ProfileSnapshot, RoleName, WaiterStatus},
    events::{EventHandlers, EventHooks, EventProducers},
    MatchingApi,
    ProfileStateStore,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

mod support;
use support::{prepare_test_env, random_db_path, seed_profile, seed_role};

async fn setup(producers: EventProducers) -> MatchingApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_role(&db, "listener", true).await;
    seed_role(&db, "admin", false).await;
    seed_profile(&db, "user-1", "ushka").await;
    seed_profile(&db, "waiter-1", "wren").await;
    let api = MatchingApi::new(db, producers);
    api.refresh_matchable_roles().await;
    api
}

async fn tear_down(api: MatchingApi<SqliteDatabase>) {
    api.db().close().await;
    if let Err(e) = Sqlite::drop_database(api.db().url()).await {
        error!("🚀️ Failed to drop test database: {e}");
    }
}

fn listener() -> RoleName {
    "listener".parse().expect("role literal")
}

#[test]
fn pairing_creates_a_room_and_notifies_both_parties() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let mut hooks = EventHooks::default();
        hooks.on_match_success(move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event).await;
            }
            .boxed()
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let api = setup(producers).await;
        assert!(api.is_matchable_role(&listener()));
        assert!(!api.is_matchable_role(&"admin".parse().unwrap()));

        api.set_waiter_working("waiter-1".into(), vec![listener()], &[listener()])
            .await
            .expect("waiter should start working");
        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Working);
        api.enqueue_user("user-1".into(), listener()).await.expect("user should enqueue");
        assert!(api.queue_status(&"user-1".into()).in_queue);

        api.run_tick(Duration::seconds(90)).await;

        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Busy);
        assert!(!api.queue_status(&"user-1".into()).in_queue);

        let event = rx.recv().await.expect("no match_success event delivered");
        assert_eq!(event.user_id, ProfileId::from("user-1"));
        assert_eq!(event.waiter_id, ProfileId::from("waiter-1"));
        let notifications = event.notifications();
        assert_eq!(notifications.len(), 2);
        for (_, n) in &notifications {
            assert_eq!(n.event_type, "match_success");
            assert_eq!(n.payload["chatRoomId"], event.chat_room.id.0.as_str());
        }

        // the room row was persisted with both participants, owned by the requesting user
        let mut conn = api.db().pool().acquire().await.unwrap();
        let room = support_match_engine::db::sqlite::chat_rooms::fetch_room(&event.chat_room.id, &mut conn)
            .await
            .unwrap()
            .expect("room row missing");
        assert_eq!(room.participant_ids, vec![ProfileId::from("user-1"), ProfileId::from("waiter-1")]);
        assert_eq!(room.owner_id, ProfileId::from("user-1"));
        assert_eq!(room.name, "Private Support Session");
        drop(conn);

        // both persisted flags are cleared
        assert!(!api.db().fetch_matching_flags(&"user-1".into()).await.unwrap().is_matching);
        assert!(!api.db().fetch_matching_flags(&"waiter-1".into()).await.unwrap().is_matching);

        tear_down(api).await;
    });
}

#[test]
fn silent_waiters_expire_and_flags_flip() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup(EventProducers::default()).await;
        api.set_waiter_working("waiter-1".into(), vec![listener()], &[listener()])
            .await
            .expect("waiter should start working");
        let flags = api.db().fetch_matching_flags(&"waiter-1".into()).await.unwrap();
        assert!(flags.is_matching);
        assert_eq!(flags.matching_roles, vec![listener()]);

        // a fresh heartbeat survives the pass
        api.run_tick(Duration::seconds(90)).await;
        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Working);

        // a negative timeout puts the cutoff in the future: the waiter is past the deadline
        api.run_tick(Duration::seconds(-1)).await;
        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Idle);
        assert!(!api.db().fetch_matching_flags(&"waiter-1".into()).await.unwrap().is_matching);

        tear_down(api).await;
    });
}

#[test]
fn reconnects_restore_state_from_persisted_flags() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup(EventProducers::default()).await;

        // the process restarted: only the persisted flags remain
        api.db().set_matching_flags(&"waiter-1".into(), true, &[listener()]).await.unwrap();
        api.db().set_matching_flags(&"user-1".into(), true, &[listener()]).await.unwrap();
        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Idle);

        let waiter_flags = api.db().fetch_matching_flags(&"waiter-1".into()).await.unwrap();
        let waiter_profile = ProfileSnapshot {
            id: "waiter-1".into(),
            is_matching: waiter_flags.is_matching,
            matching_roles: waiter_flags.matching_roles,
            permissions: vec![listener()],
        };
        let user_flags = api.db().fetch_matching_flags(&"user-1".into()).await.unwrap();
        let user_profile = ProfileSnapshot {
            id: "user-1".into(),
            is_matching: user_flags.is_matching,
            matching_roles: user_flags.matching_roles,
            permissions: vec!["user".parse().unwrap()],
        };

        // several reconnects in a row must not duplicate anything
        api.restore_state(&waiter_profile);
        api.restore_state(&waiter_profile);
        api.restore_state(&user_profile);
        api.restore_state(&user_profile);

        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Working);
        assert_eq!(api.waiter_roles(&"waiter-1".into()), vec![listener()]);
        assert_eq!(api.available_waiters(&listener()), 1);
        let status = api.queue_status(&"user-1".into());
        assert!(status.in_queue);
        assert_eq!(status.position, Some(0));

        // and the restored pair matches on the next tick
        api.run_tick(Duration::seconds(90)).await;
        assert_eq!(api.waiter_status(&"waiter-1".into()), WaiterStatus::Busy);
        assert!(!api.queue_status(&"user-1".into()).in_queue);

        tear_down(api).await;
    });
}

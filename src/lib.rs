//! Support Match Engine
//!
//! The real-time matching engine of a peer-support chat platform: it pairs users seeking support with available
//! role-qualified waiters (listeners, psychologists, therapists), keeps their transient availability state in
//! memory, mirrors it to the persisted profile flags for reconnect/restart recovery, and turns each successful
//! pairing into a chat room plus a real-time notification. It runs embedded in the serving process; authentication,
//! routing and the websocket transport all live outside.
//!
//! The library is divided into three main sections:
//! 1. The engine itself ([`MatchingApi`], [`mod@engine`]): waiter availability, the user queue, the periodic
//!    scheduler and recovery on reconnect. Route handlers call its public operations; validation failures come back
//!    as a typed [`MatchingError`].
//! 2. Storage ([`mod@traits`], [`mod@db`]): everything the engine needs from persistence is behind three small
//!    traits, with a SQLite backend provided. The persisted matching flags are a best-effort mirror; in-memory
//!    state is authoritative while the process is alive.
//! 3. Events ([`mod@events`]): a simple hook system the serving process subscribes to in order to push
//!    `match_success` (and waiter-expiry) notifications onto users' live connections. Publishing with no hooks
//!    installed is a no-op.
pub mod db;
pub mod db_types;
pub mod engine;
pub mod events;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use engine::{
    start_matching_worker,
    AvailabilityRegistry,
    MatchPair,
    MatchingApi,
    MatchingError,
    RoleDirectory,
    DEFAULT_HEARTBEAT_TIMEOUT,
    DEFAULT_TICK_INTERVAL,
};
pub use traits::{ChatRoomStore, MatchingStoreError, ProfileStateStore, RoleCatalog};

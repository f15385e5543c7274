//! # Storage collaborator contracts.
//!
//! The matching engine never talks to the database directly. Everything it needs from the persistence layer is
//! expressed by the traits in this module, and a backend (see the default SQLite implementation) implements them.
//!
//! * [`RoleCatalog`] reads the set of roles flagged as matchable by the permission system.
//! * [`ProfileStateStore`] writes through the transient availability state to the profile row's matching flags,
//!   which act as the durable shadow used for reconnect and restart recovery.
//! * [`ChatRoomStore`] creates the chat room record that a successful pairing materializes into.
mod store;

pub use store::{ChatRoomStore, MatchingStoreError, ProfileStateStore, RoleCatalog};

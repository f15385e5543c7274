//! The matching core: role directory, availability registry, public operations and the periodic scheduler.
mod availability;
mod errors;
mod matching_api;
mod role_directory;
mod scheduler;

pub use availability::{AvailabilityRegistry, MatchPair};
pub use errors::MatchingError;
pub use matching_api::MatchingApi;
pub use role_directory::RoleDirectory;
pub use scheduler::{start_matching_worker, DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_TICK_INTERVAL};

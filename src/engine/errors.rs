use thiserror::Error;

/// Caller-validation failures for the public matching operations. These surface as 4xx-style responses upstream;
/// they are never fatal. Collaborator failures never appear here: the persisted flags are a best-effort mirror and
/// store errors are logged and swallowed (see [`crate::traits::MatchingStoreError`] for the store-side taxonomy).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchingError {
    #[error("No valid roles to offer for matching")]
    NoValidRoles,
    #[error("Already working as a waiter")]
    AlreadyWorking,
    #[error("Already in matching queue")]
    AlreadyQueued,
    #[error("Not in matching queue")]
    NotInQueue,
}

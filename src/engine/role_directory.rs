use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};

use log::*;

use crate::db_types::RoleName;

/// Cached set of role names flagged as matchable in the permission system.
///
/// The cache is loaded at process start and refreshed on demand (after admin role mutations). A failed refresh
/// leaves the previous set untouched: a stale matchable-role set is preferable to a crashed scheduler, and this also
/// tolerates a roles table that has not been migrated yet.
#[derive(Debug, Default)]
pub struct RoleDirectory {
    matchable: RwLock<BTreeSet<RoleName>>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace<I: IntoIterator<Item = RoleName>>(&self, roles: I) {
        let roles: BTreeSet<RoleName> = roles.into_iter().collect();
        debug!("📇 Matchable role set replaced: {} roles", roles.len());
        *self.matchable.write().unwrap_or_else(PoisonError::into_inner) = roles;
    }

    pub fn contains(&self, role: &RoleName) -> bool {
        self.matchable.read().unwrap_or_else(PoisonError::into_inner).contains(role)
    }

    pub fn snapshot(&self) -> Vec<RoleName> {
        self.matchable.read().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.matchable.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

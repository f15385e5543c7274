//! `SqliteDatabase` is a concrete storage backend for the matching engine.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use sqlx::SqlitePool;

use super::{chat_rooms, db_url, new_pool, profiles, roles};
use crate::{
    db_types::{ChatRoom, MatchingFlags, NewChatRoom, ProfileId, RoleName},
    traits::{ChatRoomStore, MatchingStoreError, ProfileStateStore, RoleCatalog},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool using the `SME_DATABASE_URL` environment variable, or the default path.
    pub async fn new(max_connections: u32) -> Result<Self, MatchingStoreError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MatchingStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RoleCatalog for SqliteDatabase {
    async fn fetch_matchable_roles(&self) -> Result<Vec<RoleName>, MatchingStoreError> {
        let mut conn = self.pool.acquire().await?;
        roles::fetch_matchable_role_names(&mut conn).await
    }
}

impl ProfileStateStore for SqliteDatabase {
    async fn set_matching_flags(
        &self,
        profile_id: &ProfileId,
        is_matching: bool,
        roles: &[RoleName],
    ) -> Result<(), MatchingStoreError> {
        let mut conn = self.pool.acquire().await?;
        profiles::set_matching_flags(profile_id, is_matching, roles, &mut conn).await
    }

    async fn fetch_matching_flags(&self, profile_id: &ProfileId) -> Result<MatchingFlags, MatchingStoreError> {
        let mut conn = self.pool.acquire().await?;
        profiles::fetch_matching_flags(profile_id, &mut conn).await
    }
}

impl ChatRoomStore for SqliteDatabase {
    async fn insert_support_room(&self, room: NewChatRoom) -> Result<ChatRoom, MatchingStoreError> {
        let mut conn = self.pool.acquire().await?;
        chat_rooms::insert_room(room, &mut conn).await
    }
}

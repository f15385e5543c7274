use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{ChatRoom, NewChatRoom, ProfileId, RoomId, RoomStatus, RoomType},
    traits::MatchingStoreError,
};

/// Inserts a new chat room with a fresh uuid and returns the stored row.
pub async fn insert_room(room: NewChatRoom, conn: &mut SqliteConnection) -> Result<ChatRoom, MatchingStoreError> {
    let id = RoomId::from(Uuid::new_v4().to_string());
    let participants =
        serde_json::to_string(&room.participant_ids).map_err(|e| MatchingStoreError::DatabaseError(e.to_string()))?;
    sqlx::query(
        r#"INSERT INTO chatting_rooms (id, name, participant_ids, owner_id, room_type, status)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(id.0.as_str())
    .bind(room.name.as_str())
    .bind(participants)
    .bind(room.owner_id.as_str())
    .bind(room.room_type.to_string())
    .bind(room.status.to_string())
    .execute(&mut *conn)
    .await?;
    fetch_room(&id, conn)
        .await?
        .ok_or_else(|| MatchingStoreError::DatabaseError(format!("Room {id} vanished right after insertion")))
}

pub async fn fetch_room(id: &RoomId, conn: &mut SqliteConnection) -> Result<Option<ChatRoom>, MatchingStoreError> {
    let row: Option<(String, String, String, String, String, String, DateTime<Utc>)> = sqlx::query_as(
        r#"SELECT id, name, participant_ids, owner_id, room_type, status, created_at
           FROM chatting_rooms WHERE id = $1"#,
    )
    .bind(id.0.as_str())
    .fetch_optional(conn)
    .await?;
    row.map(into_chat_room).transpose()
}

fn into_chat_room(
    row: (String, String, String, String, String, String, DateTime<Utc>),
) -> Result<ChatRoom, MatchingStoreError> {
    let (id, name, participants, owner_id, room_type, status, created_at) = row;
    let participant_ids: Vec<ProfileId> =
        serde_json::from_str(&participants).map_err(|e| MatchingStoreError::DatabaseError(e.to_string()))?;
    Ok(ChatRoom {
        id: id.into(),
        name,
        participant_ids,
        owner_id: owner_id.into(),
        room_type: RoomType::from(room_type),
        status: RoomStatus::from(status),
        created_at,
    })
}

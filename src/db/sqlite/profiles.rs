use sqlx::SqliteConnection;

use crate::{
    db_types::{MatchingFlags, ProfileId, RoleName},
    traits::MatchingStoreError,
};

pub async fn set_matching_flags(
    profile_id: &ProfileId,
    is_matching: bool,
    roles: &[RoleName],
    conn: &mut SqliteConnection,
) -> Result<(), MatchingStoreError> {
    let roles_json = serde_json::to_string(roles).map_err(|e| MatchingStoreError::DatabaseError(e.to_string()))?;
    let result = sqlx::query(
        r#"UPDATE profiles SET is_matching = $1, matching_roles = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3"#,
    )
    .bind(is_matching)
    .bind(roles_json)
    .bind(profile_id.as_str())
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(MatchingStoreError::ProfileNotFound(profile_id.to_string()));
    }
    Ok(())
}

pub async fn fetch_matching_flags(
    profile_id: &ProfileId,
    conn: &mut SqliteConnection,
) -> Result<MatchingFlags, MatchingStoreError> {
    let row: Option<(bool, String)> =
        sqlx::query_as(r#"SELECT is_matching, matching_roles FROM profiles WHERE id = $1"#)
            .bind(profile_id.as_str())
            .fetch_optional(conn)
            .await?;
    let (is_matching, roles_json) = row.ok_or_else(|| MatchingStoreError::ProfileNotFound(profile_id.to_string()))?;
    let matching_roles: Vec<RoleName> =
        serde_json::from_str(&roles_json).map_err(|e| MatchingStoreError::DatabaseError(e.to_string()))?;
    Ok(MatchingFlags { is_matching, matching_roles })
}

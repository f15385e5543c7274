use log::warn;
use sqlx::SqliteConnection;

use crate::{db_types::RoleName, traits::MatchingStoreError};

pub async fn fetch_matchable_role_names(conn: &mut SqliteConnection) -> Result<Vec<RoleName>, MatchingStoreError> {
    let rows: Vec<(String,)> = sqlx::query_as(r#"SELECT name FROM roles WHERE is_matchable = 1 ORDER BY name"#)
        .fetch_all(conn)
        .await?;
    let roles = rows
        .into_iter()
        .filter_map(|(name,)| match name.parse::<RoleName>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!("🗃️ Skipping matchable role with an unusable name: {e}");
                None
            },
        })
        .collect();
    Ok(roles)
}

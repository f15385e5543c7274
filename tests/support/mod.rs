#![allow(dead_code)]
use std::path::Path;

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};
use support_match_engine::SqliteDatabase;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/support_match_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/db/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap_or_default();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub async fn seed_role(db: &SqliteDatabase, name: &str, is_matchable: bool) {
    sqlx::query(r#"INSERT INTO roles (name, is_matchable) VALUES ($1, $2)"#)
        .bind(name)
        .bind(is_matchable)
        .execute(db.pool())
        .await
        .expect("Error seeding role");
}

pub async fn seed_profile(db: &SqliteDatabase, id: &str, username: &str) {
    sqlx::query(r#"INSERT INTO profiles (id, username) VALUES ($1, $2)"#)
        .bind(id)
        .bind(username)
        .execute(db.pool())
        .await
        .expect("Error seeding profile");
}

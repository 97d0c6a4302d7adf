#![allow(dead_code)]

use actix_web::web;
use feed_server::audit::MemoryAuditLog;
use feed_server::db::SqliteStorage;
use feed_server::{AppState, Settings};
use std::sync::Arc;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "wonderland";

/// State backed by a fresh in-memory database with `alice` provisioned.
pub async fn test_state() -> (web::Data<AppState>, Arc<MemoryAuditLog>) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let storage = SqliteStorage::connect(&config.database)
        .await
        .expect("Failed to open test database");
    storage.migrate().await.expect("Failed to run migrations");

    let audit = Arc::new(MemoryAuditLog::new());
    let state = AppState::with_components(config, Arc::new(storage), audit.clone())
        .expect("Failed to build test state");
    state
        .credentials
        .provision(USERNAME, PASSWORD)
        .await
        .expect("Failed to provision test user");

    (web::Data::new(state), audit)
}

/// State whose storage pool is already closed, so every query fails.
pub async fn failing_state() -> (web::Data<AppState>, Arc<MemoryAuditLog>) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let storage = SqliteStorage::connect(&config.database)
        .await
        .expect("Failed to open test database");
    storage.migrate().await.expect("Failed to run migrations");
    storage.close().await;

    let audit = Arc::new(MemoryAuditLog::new());
    let state = AppState::with_components(config, Arc::new(storage), audit.clone())
        .expect("Failed to build test state");

    (web::Data::new(state), audit)
}

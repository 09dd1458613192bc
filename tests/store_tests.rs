mod common;

use axum::http::StatusCode;
use common::{TestApp, spawn_app, spawn_app_with, test_config};
use mama::entities::admins;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

const LEGACY_PASSWORD: &str = "legacy-password";

/// Creates `username` and replaces its hash with a bcrypt one.
async fn seed_bcrypt_admin(app: &TestApp, username: &str) {
    let store = app.state.store();
    store
        .create_admin(username, "placeholder-password", false, &app.state.config().security)
        .await
        .unwrap()
        .unwrap();

    let row = stored_admin(app, username).await;
    let mut active: admins::ActiveModel = row.into();
    active.password_hash = Set(bcrypt::hash(LEGACY_PASSWORD, 4).unwrap());
    active.update(&store.conn).await.unwrap();
}

async fn stored_admin(app: &TestApp, username: &str) -> admins::Model {
    admins::Entity::find()
        .filter(admins::Column::Username.eq(username))
        .one(&app.state.store().conn)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_bcrypt_hash_is_rehashed_on_login() {
    let app = spawn_app().await;
    seed_bcrypt_admin(&app, "legacy").await;
    assert!(stored_admin(&app, "legacy").await.password_hash.starts_with("$2"));

    let (status, body) = app.login("legacy", LEGACY_PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let rehashed = stored_admin(&app, "legacy").await.password_hash;
    assert!(rehashed.starts_with("$argon2id$"), "{rehashed}");

    let (status, _) = app.login("legacy", LEGACY_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bcrypt_hash_is_kept_when_migration_is_off() {
    let (mut config, db_path) = test_config();
    config.security.auto_migrate_password_hashes = false;
    let app = spawn_app_with(config, db_path).await;
    seed_bcrypt_admin(&app, "legacy").await;

    let (status, _) = app.login("legacy", LEGACY_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    assert!(stored_admin(&app, "legacy").await.password_hash.starts_with("$2"));
}

#[tokio::test]
async fn test_wrong_password_leaves_bcrypt_hash() {
    let app = spawn_app().await;
    seed_bcrypt_admin(&app, "legacy").await;

    let (status, _) = app.login("legacy", "not-it").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(stored_admin(&app, "legacy").await.password_hash.starts_with("$2"));
}

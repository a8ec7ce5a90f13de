//! Storage backend tests
//!
//! Tests for SeaOrmStorage using temporary SQLite databases.

use actix_web::http::StatusCode;
use gnode::config::DatabaseConfig;
use gnode::storage::backend::SeaOrmStorage;
use gnode::storage::{
    ApiTokenPatch, ApiTokenState, AuthBundle, CaFile, Device, NewApiToken, infer_backend_from_url,
};
use tempfile::TempDir;

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (SeaOrmStorage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..DatabaseConfig::default()
    };

    let storage = SeaOrmStorage::new(&config)
        .await
        .expect("Failed to create storage");

    (storage, temp_dir)
}

fn bundle(id: &str) -> AuthBundle {
    AuthBundle {
        authbundle_id: id.to_string(),
        service_type: "mqtt".to_string(),
        auth_type: "password".to_string(),
        username: Some("sensor".to_string()),
        password: Some("s3cret".to_string()),
        keyname: Some("client.key".to_string()),
        keydata: Some(b"-----BEGIN KEY-----".to_vec()),
        description: None,
    }
}

// =============================================================================
// 连接
// =============================================================================

#[tokio::test]
async fn test_empty_url_is_config_error() {
    let config = DatabaseConfig {
        database_url: String::new(),
        ..DatabaseConfig::default()
    };
    let err = SeaOrmStorage::new(&config).await.err().unwrap();
    assert_eq!(err.code(), "E001");
}

#[test]
fn test_infer_backend_rejects_unknown_scheme() {
    assert_eq!(infer_backend_from_url("/data/gnode.sqlite").unwrap(), "sqlite");
    assert_eq!(infer_backend_from_url("mariadb://db/gnode").unwrap(), "mysql");
    assert!(infer_backend_from_url("redis://cache").is_err());
}

#[tokio::test]
async fn test_sqlite_backend_name() {
    let (storage, _dir) = create_temp_storage().await;
    assert_eq!(storage.backend_name(), "sqlite");
}

// =============================================================================
// 用户
// =============================================================================

#[tokio::test]
async fn test_user_lifecycle() {
    let (storage, _dir) = create_temp_storage().await;
    assert_eq!(storage.count_users().await.unwrap(), 0);
    assert_eq!(storage.first_user_id().await.unwrap(), None);

    let admin = storage.create_user("admin", "$argon2id$hash", true).await.unwrap();
    let guest = storage.create_user("guest", "$argon2id$other", false).await.unwrap();

    assert_eq!(storage.count_users().await.unwrap(), 2);
    assert_eq!(storage.first_user_id().await.unwrap(), Some(admin.id));
    assert!(admin.is_active);

    let found = storage.find_user_by_username("guest").await.unwrap().unwrap();
    assert_eq!(found.id, guest.id);
    assert!(!found.is_admin);
    assert_eq!(storage.get_user(guest.id).await.unwrap(), Some(guest.clone()));

    storage.delete_user(guest.id).await.unwrap();
    assert!(storage.get_user(guest.id).await.unwrap().is_none());
    let err = storage.delete_user(guest.id).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let (storage, _dir) = create_temp_storage().await;
    storage.create_user("admin", "h", true).await.unwrap();

    let err = storage.create_user("admin", "h2", false).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_user_hash_is_not_serialized() {
    let (storage, _dir) = create_temp_storage().await;
    let user = storage.create_user("admin", "$argon2id$hash", true).await.unwrap();

    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("hashed_password").is_none());
    assert_eq!(value["username"], "admin");
}

// =============================================================================
// API 令牌
// =============================================================================

#[tokio::test]
async fn test_api_token_lifecycle() {
    let (storage, _dir) = create_temp_storage().await;

    let token = storage
        .create_api_token(NewApiToken {
            till: 0,
            description: Some("ci".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(token.state, ApiTokenState::Valid);
    assert!(!token.token.is_empty());
    assert!(token.usable(chrono::Utc::now().timestamp()));

    let found = storage.find_api_token(&token.token).await.unwrap().unwrap();
    assert_eq!(found.id, token.id);
    assert!(storage.find_api_token("not-a-token").await.unwrap().is_none());

    let updated = storage
        .update_api_token(
            token.id,
            ApiTokenPatch {
                state: Some(ApiTokenState::Suspended),
                till: None,
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.state, ApiTokenState::Suspended);
    assert_eq!(updated.description.as_deref(), Some("ci"));
    assert!(!updated.usable(0));

    storage.delete_api_token(token.id).await.unwrap();
    assert!(storage.list_api_tokens().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api_token_negative_till_rejected() {
    let (storage, _dir) = create_temp_storage().await;

    let err = storage
        .create_api_token(NewApiToken {
            till: -1,
            description: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_api_tokens_are_distinct() {
    let (storage, _dir) = create_temp_storage().await;

    let a = storage.create_api_token(NewApiToken::default()).await.unwrap();
    let b = storage.create_api_token(NewApiToken::default()).await.unwrap();
    assert_ne!(a.token, b.token);

    let err = storage
        .update_api_token(9999, ApiTokenPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// 认证包 / CA / 设备
// =============================================================================

#[tokio::test]
async fn test_authbundle_update_keeps_key_without_new_keydata() {
    let (storage, _dir) = create_temp_storage().await;
    storage.create_authbundle(bundle("ab1")).await.unwrap();

    let mut update = bundle("ab1");
    update.keyname = None;
    update.keydata = None;
    update.description = Some("rotated password".to_string());
    update.password = Some("new".to_string());
    storage.update_authbundle(update).await.unwrap();

    let stored = storage.get_authbundle("ab1").await.unwrap().unwrap();
    assert_eq!(stored.keyname.as_deref(), Some("client.key"));
    assert_eq!(stored.keydata.as_deref(), Some(&b"-----BEGIN KEY-----"[..]));
    assert_eq!(stored.password.as_deref(), Some("new"));
    assert_eq!(stored.description.as_deref(), Some("rotated password"));

    let value = serde_json::to_value(&stored).unwrap();
    assert!(value.get("password").is_none());
    assert!(value.get("keydata").is_none());
}

#[tokio::test]
async fn test_authbundle_missing() {
    let (storage, _dir) = create_temp_storage().await;

    assert!(storage.get_authbundle("nope").await.unwrap().is_none());
    let err = storage.update_authbundle(bundle("nope")).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    assert!(storage.delete_authbundle("nope").await.is_err());
}

#[tokio::test]
async fn test_ca_file_metadata() {
    let (storage, _dir) = create_temp_storage().await;
    storage
        .create_ca_file(CaFile {
            id: "root.pem".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let updated = storage
        .update_ca_file("root.pem", Some("corporate root".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("corporate root"));
    assert_eq!(storage.list_ca_files().await.unwrap().len(), 1);

    storage.delete_ca_file("root.pem").await.unwrap();
    assert!(storage.get_ca_file("root.pem").await.unwrap().is_none());
}

#[tokio::test]
async fn test_device_crud() {
    let (storage, _dir) = create_temp_storage().await;
    let device = Device {
        id: "modbus-1".to_string(),
        device_type: "modbus".to_string(),
        enabled: true,
        description: None,
    };
    storage.create_device(device.clone()).await.unwrap();
    assert!(storage.create_device(device.clone()).await.is_err());

    let mut changed = device.clone();
    changed.enabled = false;
    storage.update_device(changed).await.unwrap();
    assert!(!storage.get_device("modbus-1").await.unwrap().unwrap().enabled);

    let value = serde_json::to_value(&device).unwrap();
    assert_eq!(value["type"], "modbus");

    storage.delete_device("modbus-1").await.unwrap();
    assert!(storage.list_devices().await.unwrap().is_empty());
}

// =============================================================================
// 设置
// =============================================================================

#[tokio::test]
async fn test_settings_row_created_once() {
    let (storage, _dir) = create_temp_storage().await;

    let (settings, created) = storage.load_or_create_settings().await.unwrap();
    assert!(created);
    assert!(settings.api_authentication);

    storage.save_api_authentication(false).await.unwrap();
    let (settings, created) = storage.load_or_create_settings().await.unwrap();
    assert!(!created);
    assert!(!settings.api_authentication);
}

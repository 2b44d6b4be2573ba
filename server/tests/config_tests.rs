mod common;

use serial_test::serial;
use std::fs;
use std::path::PathBuf;

use auth_api::config::{load_env_files, AppConfig, ConfigError, EnvFiles, Environment};
use auth_api::db::DEFAULT_LOCAL_FETCH_ENDPOINT;

use common::{config_from, DATABASE_URL};

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("auth-api-config-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

#[test]
fn test_missing_database_url() {
    let result = AppConfig::from_lookup(|_| None);
    assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
}

#[test]
fn test_remote_sql_endpoint_from_connection_string() {
    let config = config_from(&[("NODE_ENV", "production"), ("DATABASE_URL", DATABASE_URL)]);

    assert!(!config.database.local_proxy);
    assert_eq!(
        config.database.endpoint.as_str(),
        "https://api.us-east-2.aws.neon.tech/sql"
    );
}

#[test]
fn test_neon_local_proxy_outside_development() {
    let config = config_from(&[
        ("NODE_ENV", "production"),
        ("DATABASE_URL", DATABASE_URL),
        ("NEON_LOCAL", "true"),
    ]);

    assert!(config.database.local_proxy);
    assert_eq!(config.database.endpoint.as_str(), DEFAULT_LOCAL_FETCH_ENDPOINT);

    let config = config_from(&[
        ("NODE_ENV", "test"),
        ("DATABASE_URL", DATABASE_URL),
        ("NEON_LOCAL", "true"),
        ("NEON_LOCAL_FETCH_ENDPOINT", "http://localhost:4444/sql"),
    ]);
    assert_eq!(config.database.endpoint.as_str(), "http://localhost:4444/sql");
}

#[test]
fn test_neon_local_is_ignored_in_development() {
    let config = config_from(&[
        ("NODE_ENV", "development"),
        ("DATABASE_URL", DATABASE_URL),
        ("NEON_LOCAL", "true"),
    ]);

    assert_eq!(config.environment, Environment::Development);
    assert!(!config.database.local_proxy);
}

#[test]
fn test_debug_output_hides_secrets() {
    let config = config_from(&[
        ("DATABASE_URL", DATABASE_URL),
        ("JWT_SECRET", "super-secret-signing-key-do-not-log-1234"),
        ("ARCJET_KEY", "ajkey_live_abcdefghijkl"),
    ]);

    let rendered = format!("{config:?}");
    assert!(!rendered.contains("super-secret-signing-key"));
    assert!(!rendered.contains(":secret@"));
    assert!(!rendered.contains("abcdefghijkl"));
    assert!(rendered.contains("ajkey_****"));
}

#[test]
fn test_env_files_read_without_touching_process() {
    let dir = scratch_dir();
    fs::write(dir.join(".env"), "PORT=3100\nLOG_LEVEL=debug\n").expect("write .env");
    fs::write(dir.join(".env.test"), "PORT=3200\n").expect("write .env.test");

    let files = EnvFiles::read(&dir, Some("test")).expect("Failed to read env files");

    assert_eq!(files.get("PORT"), Some("3200"));
    assert_eq!(files.get("LOG_LEVEL"), Some("debug"));
    assert_eq!(files.loaded().len(), 2);
}

#[test]
fn test_malformed_env_file() {
    let dir = scratch_dir();
    fs::write(dir.join(".env"), "NOT A VALID LINE\n").expect("write .env");

    let result = EnvFiles::read(&dir, None);
    assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
}

#[test]
#[serial]
fn test_load_env_files_keeps_existing_variables() {
    let dir = scratch_dir();
    fs::write(
        dir.join(".env"),
        "AUTH_API_TEST_FROM_FILE=file\nAUTH_API_TEST_PRESET=file\n",
    )
    .expect("write .env");

    std::env::remove_var("AUTH_API_TEST_FROM_FILE");
    std::env::set_var("AUTH_API_TEST_PRESET", "process");

    let files = load_env_files(&dir).expect("Failed to load env files");

    assert_eq!(files.len(), 2);
    assert_eq!(std::env::var("AUTH_API_TEST_FROM_FILE").as_deref(), Ok("file"));
    assert_eq!(std::env::var("AUTH_API_TEST_PRESET").as_deref(), Ok("process"));

    std::env::remove_var("AUTH_API_TEST_FROM_FILE");
    std::env::remove_var("AUTH_API_TEST_PRESET");
}

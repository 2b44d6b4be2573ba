use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use anyhow::Context;
use std::time::Duration;
use tokio::time;

use auth_api::config::{load_env_files, AppConfig, DEFAULT_LOG_LEVEL};
use auth_api::db::{prepare_unknown_account_check, SqlClient, UserRepository};
use auth_api::handlers::{self, Uptime};
use auth_api::jwt::JwtService;
use auth_api::middleware::protection_middleware;
use auth_api::protection::ProtectionPolicy;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env, then .env.<NODE_ENV>; real environment variables win
    let env_files = load_env_files(".")?;

    // Initialize logger before configuration so its warnings are visible.
    // RUST_LOG wins over LOG_LEVEL.
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(log_level));

    let config = AppConfig::from_env()?;

    for path in env_files.loaded() {
        log::info!("Loaded environment from {}", path.display());
    }
    log::info!(
        "Starting auth API in {} mode (log level {})...",
        config.environment.as_str(),
        config.log_level
    );
    log::info!("Database: {:?}", config.database);

    let sql_client = SqlClient::new(config.database.clone())
        .context("Failed to create database client")?;
    let users = UserRepository::new(sql_client);

    log::info!("Preparing database schema...");
    users
        .ensure_schema()
        .await
        .context("Failed to prepare database schema")?;

    prepare_unknown_account_check();

    let jwt = JwtService::new(&config.jwt);
    let policy = ProtectionPolicy::new(&config.protection);
    let uptime = Uptime::start();

    // Background cleanup of expired protection state
    let policy_clone = policy.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            policy_clone.cleanup();
            log::debug!("Background cleanup: pruned protection rule state");
        }
    });

    let bind_addr = (config.host.clone(), config.port);
    log::info!("Starting HTTP server at {}:{}...", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(web::Data::new(users.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(policy.clone()))
            .app_data(web::Data::new(uptime))
            // Middleware
            .wrap(actix_middleware::from_fn(protection_middleware))
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}

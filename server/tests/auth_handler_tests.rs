mod common;

use actix_web::cookie::{time::Duration as CookieDuration, SameSite};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::json;

use auth_api::config::{AppConfig, Environment};
use auth_api::db::{Role, SqlClient, UserRepository};
use auth_api::handlers;
use auth_api::jwt::{JwtService, SessionClaims};

use common::{send, test_config};

/// Shared state for the routes. The repository points at an unreachable
/// database; every request here is answered before it is queried.
fn state(config: &AppConfig) -> (UserRepository, JwtService) {
    let client = SqlClient::new(config.database.clone()).expect("sql client");
    (UserRepository::new(client), JwtService::new(&config.jwt))
}

fn session() -> SessionClaims {
    SessionClaims {
        id: 42,
        email: "ada@example.com".to_string(),
        role: Role::Admin,
    }
}

macro_rules! app {
    ($config:expr) => {{
        let config: AppConfig = $config;
        let (users, jwt) = state(&config);
        test::init_service(
            App::new()
                .app_data(web::Data::new(users))
                .app_data(web::Data::new(jwt))
                .app_data(web::Data::new(config))
                .configure(handlers::configure),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_sign_up_rejects_invalid_payload() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-up")
        .set_json(json!({ "name": "A", "email": "not-an-email", "password": "123" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation failed");

    let details = body["details"].as_array().expect("details array");
    let has = |field: &str, message: &str| {
        details
            .iter()
            .any(|detail| detail["field"] == field && detail["message"] == message)
    };
    assert!(has("name", "Name is required"));
    assert!(has("email", "Invalid email address"));
    assert!(has("password", "Password must be at least 6 characters"));
}

#[actix_web::test]
async fn test_sign_up_rejects_unknown_role() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-up")
        .set_json(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "password": "analytical",
            "role": "superuser"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "role");
    assert_eq!(
        body["details"][0]["message"],
        "Invalid enum value. Expected 'user' | 'admin', received 'superuser'"
    );
}

#[actix_web::test]
async fn test_sign_up_rejects_non_object_body() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-up")
        .set_json(json!(["ada@example.com"]))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["message"], "Expected object, received array");
}

#[actix_web::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-in")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"email\": ")
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid request body");

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-up")
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("name=Ada")
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid request body");
}

#[actix_web::test]
async fn test_sign_in_requires_fields() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-in")
        .set_json(json!({ "email": "ada@example.com", "password": "" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password");
    assert_eq!(body["details"][0]["message"], "Password is required");

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-in")
        .set_json(json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn test_sign_out_clears_cookie() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::post()
        .uri("/api/auth/sign-out")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "token")
        .expect("token cookie");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User signed out successfully");
}

#[actix_web::test]
async fn test_me_requires_token() {
    let app = app!(test_config("test"));

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[actix_web::test]
async fn test_me_with_cookie_token() {
    let config = test_config("test");
    let token = JwtService::new(&config.jwt).sign(&session()).expect("token");
    let app = app!(config);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(handlers::session_cookie(token, Environment::Test))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], 42);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "admin");
}

#[actix_web::test]
async fn test_me_with_bearer_token() {
    let config = test_config("test");
    let token = JwtService::new(&config.jwt).sign(&session()).expect("token");
    let app = app!(config);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], 42);
}

#[actix_web::test]
async fn test_me_rejects_token_from_another_secret() {
    let foreign = common::config_from(&[
        ("NODE_ENV", "test"),
        ("DATABASE_URL", common::DATABASE_URL),
        ("JWT_SECRET", "a-completely-different-secret-value-123"),
    ]);
    let token = JwtService::new(&foreign.jwt).sign(&session()).expect("token");
    let app = app!(test_config("test"));

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[::core::prelude::v1::test]
fn test_session_cookie_attributes() {
    let cookie = handlers::session_cookie("abc".to_string(), Environment::Production);
    assert_eq!(cookie.name(), "token");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.max_age(), Some(CookieDuration::minutes(15)));

    let cookie = handlers::session_cookie("abc".to_string(), Environment::Development);
    assert_eq!(cookie.secure(), Some(false));
}

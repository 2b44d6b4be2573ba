use actix_web::{test, web, App};
use auth_api::handlers::{self, Uptime};
use chrono::DateTime;

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(Uptime::start()))
            .service(handlers::health_check),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "OK");
    assert!(body["uptime"].as_f64().expect("numeric uptime") >= 0.0);

    let timestamp = body["timestamp"].as_str().expect("timestamp string");
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[actix_web::test]
async fn test_health_check_without_uptime_state() {
    let app = test::init_service(App::new().service(handlers::health_check)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["uptime"], 0.0);
}

#[actix_web::test]
async fn test_api_status() {
    let app = test::init_service(App::new().service(handlers::api_status)).await;

    let req = test::TestRequest::get().uri("/api").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "API is running");
}

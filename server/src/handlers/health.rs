use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

use crate::error::Result;

/// When the process started serving, for `/health` uptime.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: f64,
}

#[get("/health")]
pub async fn health_check(uptime: Option<web::Data<Uptime>>) -> Result<HttpResponse> {
    let response = HealthCheckResponse {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: uptime.map(|uptime| uptime.seconds()).unwrap_or(0.0),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Serialize)]
pub struct ApiStatusResponse {
    pub message: String,
}

#[get("/api")]
pub async fn api_status() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiStatusResponse {
        message: "API is running".to_string(),
    }))
}

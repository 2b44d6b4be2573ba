use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web,
};
use std::net::{IpAddr, Ipv4Addr};

use crate::error::ApiError;
use crate::protection::{Decision, ProtectionPolicy, RequestContext};

pub async fn protection_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    // Get ProtectionPolicy from app data
    let policy = req
        .app_data::<web::Data<ProtectionPolicy>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("Protection policy not available".to_string()))?;

    let context = request_context(&req);

    match policy.protect(&context) {
        Decision::Allow => next.call(req).await,
        Decision::Deny(reason) => Err(ApiError::from(reason).into()),
    }
}

pub fn request_context(req: &ServiceRequest) -> RequestContext {
    // Clients without a peer address share one bucket
    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    RequestContext {
        ip,
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        user_agent,
    }
}

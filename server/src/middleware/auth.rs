use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web, HttpMessage,
};

use crate::error::ApiError;
use crate::jwt::{JwtService, SessionClaims};

/// Cookie that carries the signed session token.
pub const TOKEN_COOKIE: &str = "token";

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    // Cookie first, then an `Authorization: Bearer` header
    let token = req
        .cookie(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(&req))
        .ok_or(ApiError::Unauthorized)?;

    let jwt = req
        .app_data::<web::Data<JwtService>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("Token service not available".to_string()))?;

    let claims: SessionClaims = jwt.verify_as(&token).map_err(ApiError::from)?;

    // Make the claims available via ReqData
    req.extensions_mut().insert(claims);

    next.call(req).await
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

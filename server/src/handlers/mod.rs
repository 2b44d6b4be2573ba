pub mod auth;
pub mod health;

use actix_web::{error::JsonPayloadError, middleware::from_fn, web, HttpRequest};

use crate::error::ApiError;
use crate::middleware::auth_middleware;

pub use auth::{me, session_cookie, sign_in, sign_out, sign_up};
pub use health::{api_status, health_check, Uptime};

/// Registers every route. Shared state (`UserRepository`, `JwtService`,
/// `AppConfig`, `ProtectionPolicy`, `Uptime`) is expected as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(health_check)
        .service(api_status)
        .service(
            web::scope("/api/auth")
                // Public routes (no authentication required)
                .service(sign_up)
                .service(sign_in)
                .service(sign_out)
                // Protected routes (authentication required)
                .service(web::scope("").wrap(from_fn(auth_middleware)).service(me)),
        );
}

/// Malformed bodies and wrong content types get the same error envelope as
/// every other failure.
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected body for {} {}: {}", req.method(), req.path(), err);
    ApiError::InvalidBody(err.to_string()).into()
}

pub mod auth;
pub mod protection;

pub use auth::{auth_middleware, TOKEN_COOKIE};
pub use protection::protection_middleware;

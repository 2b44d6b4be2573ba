// Library exports for testing and reuse

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod protection;
pub mod validation;

mod client;
mod models;
mod repository;

pub use client::{
    DatabaseConfig, Field, QueryResult, SqlClient, SqlError, DEFAULT_LOCAL_FETCH_ENDPOINT,
};
pub use models::{
    prepare_unknown_account_check, verify_unknown_account, NewUser, Role, User, UserProfile,
};
pub use repository::UserRepository;

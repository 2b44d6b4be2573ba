use serde_json::Value;

use super::client::{SqlClient, SqlError};
use super::models::{NewUser, User};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id bigserial PRIMARY KEY,
    name varchar(255) NOT NULL,
    email varchar(255) NOT NULL UNIQUE,
    password varchar(255) NOT NULL,
    role varchar(50) NOT NULL DEFAULT 'user',
    created_at timestamp NOT NULL DEFAULT now(),
    updated_at timestamp NOT NULL DEFAULT now()
)";

const FIND_USER_BY_EMAIL: &str = "SELECT id, name, email, password, role, created_at, updated_at
    FROM users WHERE email = $1 LIMIT 1";

const INSERT_USER: &str = "INSERT INTO users (name, email, password, role)
    VALUES ($1, $2, $3, $4)
    RETURNING id, name, email, password, role, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    client: SqlClient,
}

impl UserRepository {
    pub fn new(client: SqlClient) -> Self {
        Self { client }
    }

    pub async fn ensure_schema(&self) -> Result<(), SqlError> {
        self.client.query(CREATE_USERS_TABLE, &[]).await?;
        log::info!("Users table is ready");
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, SqlError> {
        let result = self
            .client
            .query(FIND_USER_BY_EMAIL, &[Value::from(email)])
            .await?;
        result.first_as()
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, SqlError> {
        let params = [
            Value::from(user.name.as_str()),
            Value::from(user.email.as_str()),
            Value::from(user.password_hash.as_str()),
            Value::from(user.role.as_str()),
        ];

        let result = self.client.query(INSERT_USER, &params).await?;
        let created = result
            .first_as::<User>()?
            .ok_or_else(|| SqlError::Decode("insert returned no rows".to_string()))?;

        log::info!("Created user {} ({})", created.id, created.email);
        Ok(created)
    }
}

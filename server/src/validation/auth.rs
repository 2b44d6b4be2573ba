use serde_json::Value;

use super::{text_len, is_valid_email, type_name, ObjectInput, ValidationErrors};
use crate::db::Role;

const MAX_NAME_LEN: usize = 256;
const MAX_EMAIL_LEN: usize = 256;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn parse_signup(input: &Value) -> Result<SignupRequest, ValidationErrors> {
    let mut object = ObjectInput::new(input)?;

    let name = object.string("name");
    if let Some(name) = name {
        object.check("name", text_len(name) >= 2, "Name is required");
        object.check(
            "name",
            text_len(name) <= MAX_NAME_LEN,
            "Name must be at most 256 characters",
        );
    }

    let email = object.string("email");
    if let Some(email) = email {
        object.check("email", text_len(email) >= 2, "Email is required");
        check_email(&mut object, email);
    }

    let password = object.string("password");
    if let Some(password) = password {
        object.check(
            "password",
            text_len(password) >= MIN_PASSWORD_LEN,
            "Password must be at least 6 characters",
        );
        object.check(
            "password",
            text_len(password) <= MAX_PASSWORD_LEN,
            "Password must be at most 128 characters",
        );
    }

    let role = read_role(&mut object);

    match (name, email, password, role) {
        (Some(name), Some(email), Some(password), Some(role)) if object.is_valid() => {
            Ok(SignupRequest {
                name: name.to_string(),
                email: normalize_email(email),
                password: password.to_string(),
                role,
            })
        }
        _ => Err(object.into_errors()),
    }
}

pub fn parse_sign_in(input: &Value) -> Result<SignInRequest, ValidationErrors> {
    let mut object = ObjectInput::new(input)?;

    let email = object.string("email");
    if let Some(email) = email {
        check_email(&mut object, email);
    }

    let password = object.string("password");
    if let Some(password) = password {
        object.check("password", !password.is_empty(), "Password is required");
    }

    match (email, password) {
        (Some(email), Some(password)) if object.is_valid() => Ok(SignInRequest {
            email: normalize_email(email),
            password: password.to_string(),
        }),
        _ => Err(object.into_errors()),
    }
}

fn check_email(object: &mut ObjectInput<'_>, email: &str) {
    object.check("email", is_valid_email(email), "Invalid email address");
    object.check(
        "email",
        text_len(email) <= MAX_EMAIL_LEN,
        "Email must be at most 256 characters",
    );
}

fn normalize_email(email: &str) -> String {
    email.to_lowercase().trim().to_string()
}

/// Absent means the default role; `null` or any other value is an issue.
fn read_role(object: &mut ObjectInput<'_>) -> Option<Role> {
    match object.get("role") {
        None => Some(Role::default()),
        Some(Value::String(raw)) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                object.fail(
                    "role",
                    format!("Invalid enum value. Expected 'user' | 'admin', received '{raw}'"),
                );
                None
            }
        },
        Some(other) => {
            object.fail(
                "role",
                format!("Expected 'user' | 'admin', received {}", type_name(other)),
            );
            None
        }
    }
}

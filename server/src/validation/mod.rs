//! Request body schemas.
//!
//! Each schema takes an untyped JSON value and returns either a normalized,
//! typed request or every field issue found. Checks for a field run in
//! declaration order against the raw input; normalization happens only once
//! the checks pass.

mod auth;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

pub use auth::{parse_sign_in, parse_signup, SignInRequest, SignupRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Messages recorded against one field, in the order they were found.
    pub fn messages_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| error.message.as_str())
    }

    fn single(field: &str, message: String) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|error| error.message.as_str()).collect();
        f.write_str(&messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// JSON type name as it appears in `Expected ..., received <type>` messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field reader over a JSON object that accumulates issues as it goes.
pub(crate) struct ObjectInput<'a> {
    fields: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> ObjectInput<'a> {
    pub(crate) fn new(input: &'a Value) -> Result<Self, ValidationErrors> {
        match input {
            Value::Object(fields) => Ok(Self {
                fields,
                errors: ValidationErrors::new(),
            }),
            other => Err(ValidationErrors::single(
                "",
                format!("Expected object, received {}", type_name(other)),
            )),
        }
    }

    pub(crate) fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field)
    }

    /// Reads a required string field, recording `Required` or a type issue.
    pub(crate) fn string(&mut self, field: &str) -> Option<&'a str> {
        match self.fields.get(field) {
            Some(Value::String(value)) => Some(value.as_str()),
            Some(other) => {
                let message = format!("Expected string, received {}", type_name(other));
                self.errors.push(field, message);
                None
            }
            None => {
                self.errors.push(field, "Required");
                None
            }
        }
    }

    pub(crate) fn check(&mut self, field: &str, ok: bool, message: &str) -> bool {
        if !ok {
            self.errors.push(field, message);
        }
        ok
    }

    pub(crate) fn fail(&mut self, field: &str, message: String) {
        self.errors.push(field, message);
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

/// Length in UTF-16 code units, so astral characters count twice.
pub(crate) fn text_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Email shape check: a dotted local part without leading or doubled dots,
/// and a domain of alphanumeric labels ending in an alphabetic TLD.
pub(crate) fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.starts_with('.') || value.contains("..") {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '-' | '.'));
    let local_end_ok = local
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
    if !local_ok || !local_end_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, hosts)) = labels.split_last() else {
        return false;
    };
    if hosts.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    hosts.iter().all(|label| {
        let mut chars = label.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

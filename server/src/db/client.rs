use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ConfigError, Environment};

/// Proxy address used when `NEON_LOCAL_FETCH_ENDPOINT` is not set.
pub const DEFAULT_LOCAL_FETCH_ENDPOINT: &str = "http://neon-local:5432/sql";

// Postgres type OIDs that get converted out of their text form.
const BOOL_OID: u32 = 16;
const INT8_OID: u32 = 20;
const INT2_OID: u32 = 21;
const INT4_OID: u32 = 23;
const OID_OID: u32 = 26;
const JSON_OID: u32 = 114;
const FLOAT4_OID: u32 = 700;
const FLOAT8_OID: u32 = 701;
const JSONB_OID: u32 = 3802;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("failed to reach database: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database returned {status}: {message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("failed to decode query result: {0}")]
    Decode(String),
}

impl SqlError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SqlError::Server { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }
}

/// Where and how queries are sent.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub endpoint: Url,
    pub local_proxy: bool,
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL`, and redirects to the local proxy when
    /// `NEON_LOCAL=true` outside of development.
    pub fn from_lookup<F>(lookup: F, environment: Environment) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_string = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let connection = Url::parse(&connection_string).map_err(|err| ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: err.to_string(),
        })?;

        let local_proxy =
            !environment.is_development() && lookup("NEON_LOCAL").as_deref() == Some("true");

        let endpoint = if local_proxy {
            let raw = lookup("NEON_LOCAL_FETCH_ENDPOINT")
                .filter(|endpoint| !endpoint.is_empty())
                .unwrap_or_else(|| DEFAULT_LOCAL_FETCH_ENDPOINT.to_string());
            Url::parse(&raw).map_err(|err| ConfigError::Invalid {
                name: "NEON_LOCAL_FETCH_ENDPOINT",
                reason: err.to_string(),
            })?
        } else {
            remote_endpoint(&connection)?
        };

        Ok(Self {
            connection_string,
            endpoint,
            local_proxy,
        })
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = match Url::parse(&self.connection_string) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            Ok(url) => url.to_string(),
            Err(_) => "<invalid>".to_string(),
        };

        f.debug_struct("DatabaseConfig")
            .field("connection_string", &redacted)
            .field("endpoint", &self.endpoint.as_str())
            .field("local_proxy", &self.local_proxy)
            .finish()
    }
}

/// `ep-x.region.aws.neon.tech` is served at `https://api.region.aws.neon.tech/sql`.
/// Single-label hosts and IP literals are used unchanged.
fn remote_endpoint(connection: &Url) -> Result<Url, ConfigError> {
    let host = connection.host_str().ok_or_else(|| ConfigError::Invalid {
        name: "DATABASE_URL",
        reason: "connection string has no host".to_string(),
    })?;

    let is_ip = host.starts_with('[') || host.parse::<IpAddr>().is_ok();
    let api_host = match host.split_once('.') {
        Some((_, rest)) if !is_ip => format!("api.{rest}"),
        _ => host.to_string(),
    };

    Url::parse(&format!("https://{api_host}/sql")).map_err(|err| ConfigError::Invalid {
        name: "DATABASE_URL",
        reason: err.to_string(),
    })
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    params: Vec<Value>,
}

/// Column metadata returned alongside rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "dataTypeID")]
    pub data_type_id: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueryResult {
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    rows: Vec<Map<String, Value>>,
    #[serde(default)]
    command: String,
    row_count: Option<u64>,
}

#[derive(Deserialize)]
struct RawServerError {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub command: String,
    pub row_count: u64,
    pub fields: Vec<Field>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    /// Decodes a response body, converting text cells by column type.
    pub fn from_slice(body: &[u8]) -> Result<Self, SqlError> {
        let raw: RawQueryResult =
            serde_json::from_slice(body).map_err(|err| SqlError::Decode(err.to_string()))?;

        let rows = raw
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(column, value)| {
                        let type_oid = raw
                            .fields
                            .iter()
                            .find(|field| field.name == column)
                            .map(|field| field.data_type_id);
                        let value = match type_oid {
                            Some(oid) => convert_text(value, oid),
                            None => value,
                        };
                        (column, value)
                    })
                    .collect()
            })
            .collect::<Vec<Map<String, Value>>>();

        Ok(Self {
            command: raw.command,
            row_count: raw.row_count.unwrap_or(rows.len() as u64),
            fields: raw.fields,
            rows,
        })
    }

    pub fn rows_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, SqlError> {
        self.rows
            .iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row.clone()))
                    .map_err(|err| SqlError::Decode(err.to_string()))
            })
            .collect()
    }

    pub fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>, SqlError> {
        self.rows
            .first()
            .map(|row| {
                serde_json::from_value(Value::Object(row.clone()))
                    .map_err(|err| SqlError::Decode(err.to_string()))
            })
            .transpose()
    }
}

fn convert_text(value: Value, type_oid: u32) -> Value {
    let Value::String(text) = value else {
        return value;
    };

    match type_oid {
        BOOL_OID => Value::Bool(text == "t" || text == "true"),
        INT2_OID | INT4_OID | INT8_OID | OID_OID => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        FLOAT4_OID | FLOAT8_OID => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        JSON_OID | JSONB_OID => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

/// Parameters travel as text; structured values are sent as JSON text.
fn encode_param(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(text) => Value::String(text.clone()),
        Value::Bool(flag) => Value::String(flag.to_string()),
        Value::Number(number) => Value::String(number.to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Process-wide query handle. Cloning shares the underlying HTTP client.
#[derive(Clone)]
pub struct SqlClient {
    http: Client,
    config: Arc<DatabaseConfig>,
}

impl SqlClient {
    pub fn new(config: DatabaseConfig) -> Result<Self, SqlError> {
        let http = Client::builder().build()?;

        if config.local_proxy {
            log::info!("Database queries routed to local proxy at {}", config.endpoint);
        }

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn build_request(&self, sql: &str, params: &[Value]) -> Result<reqwest::Request, SqlError> {
        let body = QueryBody {
            query: sql,
            params: params.iter().map(encode_param).collect(),
        };

        let request = self
            .http
            .post(self.config.endpoint.clone())
            .header("Neon-Connection-String", self.config.connection_string.as_str())
            .header("Neon-Raw-Text-Output", "true")
            .header("Neon-Array-Mode", "false")
            .json(&body)
            .build()?;

        Ok(request)
    }

    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, SqlError> {
        let request = self.build_request(sql, params)?;
        log::debug!("Executing query against {}", self.config.endpoint);

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }

        QueryResult::from_slice(&body)
    }
}

fn server_error(status: u16, body: &[u8]) -> SqlError {
    match serde_json::from_slice::<RawServerError>(body) {
        Ok(raw) => SqlError::Server {
            status,
            message: raw
                .message
                .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
            code: raw.code,
        },
        Err(_) => SqlError::Server {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
            code: None,
        },
    }
}

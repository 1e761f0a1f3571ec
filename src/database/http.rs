use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::error::StorageError;
use super::postgrest::{Credentials, Operation, TableRequest, Transport};
use crate::config::StoreConfig;

/// Error body returned by PostgREST on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Talks to the hosted store's REST endpoint (`<url>/rest/v1`).
///
/// The underlying `reqwest::Client` is shared by every session; credentials
/// are attached per call, so the client itself never carries user state.
pub struct HttpTransport {
    client: Client,
    rest_url: String,
}

impl HttpTransport {
    pub fn new(config: &StoreConfig) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let rest_url = format!("{}/rest/v1", config.url.as_str().trim_end_matches('/'));

        Ok(Self { client, rest_url })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        credentials: &Credentials,
        request: TableRequest,
    ) -> Result<Vec<Value>, StorageError> {
        let method = match request.operation {
            Operation::Select => Method::GET,
            Operation::Insert(_) => Method::POST,
            Operation::Update(_) => Method::PATCH,
            Operation::Delete => Method::DELETE,
        };

        debug!(
            "store {} {} (user scoped: {})",
            method,
            request.table,
            credentials.access_token().is_some()
        );

        let mut builder = self
            .client
            .request(method, self.table_url(&request.table))
            .query(&request.query_pairs())
            .header("apikey", credentials.api_key())
            .bearer_auth(credentials.bearer())
            .header(header::ACCEPT, "application/json");

        match &request.operation {
            Operation::Insert(body) | Operation::Update(body) => {
                builder = builder.header("Prefer", "return=representation").json(body);
            }
            Operation::Delete => {
                builder = builder.header("Prefer", "return=representation");
            }
            Operation::Select => {}
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row => Ok(vec![row]),
        }
    }
}

fn rejection(status: StatusCode, body: &str) -> StorageError {
    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();

    let mut message = parsed
        .message
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());
    if let Some(details) = parsed.details {
        message = format!("{} ({})", message, details);
    }
    if let Some(hint) = parsed.hint {
        message = format!("{}; hint: {}", message, hint);
    }

    StorageError::Rejected {
        status: status.as_u16(),
        code: parsed.code,
        message,
    }
}

//! In-process stand-ins for the hosted store, used by the test suites.
//!
//! [`InMemoryTransport`] behaves like PostgREST in front of a `tasks` table
//! with row-level security: it verifies the bearer token with the shared
//! secret, stamps the owner from the token's `sub`, and only lets each
//! caller see and change its own rows.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::database::{Credentials, Direction, Operation, StorageError, TableRequest, Transport};

const OWNER_COLUMN: &str = "user_id";
const WRITABLE_COLUMNS: &[&str] = &["titulo", "descripcion", "completada", OWNER_COLUMN];

/// Sign an HS256 token the way the hosted auth service does.
pub fn sign_token(secret: &str, subject: Option<&str>) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "aud": "authenticated",
        "role": "authenticated",
        "iat": now,
        "exp": now + 3600,
    });
    if let Some(sub) = subject {
        claims["sub"] = json!(sub);
    }
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// One call as seen by the store.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub bearer: String,
    pub request: TableRequest,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    last_stamp: Option<DateTime<Utc>>,
    rows: Vec<Map<String, Value>>,
    calls: Vec<RecordedCall>,
}

impl StoreState {
    /// Strictly increasing timestamps, even within one clock tick.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

pub struct InMemoryTransport {
    table: String,
    api_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
    state: Mutex<StoreState>,
}

impl InMemoryTransport {
    pub fn new(api_key: &str, jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            table: crate::database::repository::TASKS_TABLE.to_string(),
            api_key: api_key.to_string(),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Every call received so far, oldest first.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Raw stored row, bypassing row-level security.
    pub async fn raw_row(&self, id: i64) -> Option<Map<String, Value>> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .find(|row| row.get("id") == Some(&json!(id)))
            .cloned()
    }

    /// Resolves the caller's role: `Some(sub)` for a user, `None` for anon.
    fn authorize(&self, credentials: &Credentials) -> Result<Option<String>, StorageError> {
        if credentials.api_key() != self.api_key {
            return Err(rejected(401, None, "Invalid API key"));
        }

        let token = match credentials.access_token() {
            Some(token) => token,
            None => return Ok(None),
        };

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| rejected(401, Some("PGRST301"), &e.to_string()))?;

        match data.claims.get("sub").and_then(Value::as_str) {
            Some(sub) => Ok(Some(sub.to_string())),
            None => Err(rejected(401, Some("PGRST301"), "JWT has no subject")),
        }
    }
}

fn rejected(status: u16, code: Option<&str>, message: &str) -> StorageError {
    StorageError::Rejected {
        status,
        code: code.map(str::to_string),
        message: message.to_string(),
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => cell_text(a).cmp(&cell_text(b)),
    }
}

fn matches(row: &Map<String, Value>, owner: &str, filters: &[(String, String)]) -> bool {
    row.get(OWNER_COLUMN).and_then(Value::as_str) == Some(owner)
        && filters
            .iter()
            .all(|(column, value)| cell_text(row.get(column)) == *value)
}

fn checked_fields(body: &Value) -> Result<&Map<String, Value>, StorageError> {
    let fields = body
        .as_object()
        .ok_or_else(|| rejected(400, Some("PGRST102"), "Body must be a JSON object"))?;
    if let Some(column) = fields.keys().find(|k| !WRITABLE_COLUMNS.contains(&k.as_str())) {
        return Err(rejected(
            400,
            Some("PGRST204"),
            &format!("Could not find the '{}' column of 'tasks'", column),
        ));
    }
    Ok(fields)
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn execute(
        &self,
        credentials: &Credentials,
        request: TableRequest,
    ) -> Result<Vec<Value>, StorageError> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall {
            api_key: credentials.api_key().to_string(),
            bearer: credentials.bearer().to_string(),
            request: request.clone(),
        });

        let role = self.authorize(credentials)?;

        if request.table != self.table {
            return Err(rejected(404, Some("PGRST205"), "Could not find the table"));
        }

        match &request.operation {
            Operation::Select => {
                let Some(owner) = role else {
                    return Ok(Vec::new());
                };
                let mut rows: Vec<Map<String, Value>> = state
                    .rows
                    .iter()
                    .filter(|row| matches(row, &owner, &request.filters))
                    .cloned()
                    .collect();
                for (column, direction) in request.order.iter().rev() {
                    rows.sort_by(|a, b| {
                        let ord = compare_cells(a.get(column), b.get(column));
                        match direction {
                            Direction::Ascending => ord,
                            Direction::Descending => ord.reverse(),
                        }
                    });
                }
                Ok(rows.into_iter().map(Value::Object).collect())
            }
            Operation::Insert(body) => {
                let fields = checked_fields(body)?;
                let Some(owner) = role else {
                    return Err(rejected(
                        401,
                        Some("42501"),
                        "new row violates row-level security policy for table \"tasks\"",
                    ));
                };
                if let Some(claimed) = fields.get(OWNER_COLUMN) {
                    if claimed.as_str() != Some(owner.as_str()) {
                        return Err(rejected(
                            403,
                            Some("42501"),
                            "new row violates row-level security policy for table \"tasks\"",
                        ));
                    }
                }
                let titulo = match fields.get("titulo") {
                    Some(Value::String(t)) => t.clone(),
                    _ => {
                        return Err(rejected(
                            400,
                            Some("23502"),
                            "null value in column \"titulo\" violates not-null constraint",
                        ))
                    }
                };

                state.next_id += 1;
                let stamp = state.stamp().to_rfc3339_opts(SecondsFormat::Micros, true);
                let mut row = Map::new();
                row.insert("id".to_string(), json!(state.next_id));
                row.insert("titulo".to_string(), json!(titulo));
                row.insert(
                    "descripcion".to_string(),
                    fields.get("descripcion").cloned().unwrap_or(Value::Null),
                );
                row.insert(
                    "completada".to_string(),
                    fields.get("completada").cloned().unwrap_or(json!(false)),
                );
                row.insert(OWNER_COLUMN.to_string(), json!(owner));
                row.insert("created_at".to_string(), json!(stamp));
                row.insert("updated_at".to_string(), json!(stamp));

                state.rows.push(row.clone());
                Ok(vec![Value::Object(row)])
            }
            Operation::Update(body) => {
                let fields = checked_fields(body)?;
                let Some(owner) = role else {
                    return Ok(Vec::new());
                };
                if let Some(claimed) = fields.get(OWNER_COLUMN) {
                    if claimed.as_str() != Some(owner.as_str()) {
                        return Err(rejected(
                            403,
                            Some("42501"),
                            "new row violates row-level security policy for table \"tasks\"",
                        ));
                    }
                }
                let stamp = state.stamp().to_rfc3339_opts(SecondsFormat::Micros, true);
                let mut updated = Vec::new();
                for row in state
                    .rows
                    .iter_mut()
                    .filter(|row| matches(row, &owner, &request.filters))
                {
                    for (column, value) in fields {
                        row.insert(column.clone(), value.clone());
                    }
                    row.insert("updated_at".to_string(), json!(stamp));
                    updated.push(Value::Object(row.clone()));
                }
                Ok(updated)
            }
            Operation::Delete => {
                let Some(owner) = role else {
                    return Ok(Vec::new());
                };
                let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.rows)
                    .into_iter()
                    .partition(|row| matches(row, &owner, &request.filters));
                state.rows = kept;
                Ok(removed.into_iter().map(Value::Object).collect())
            }
        }
    }
}

// PostgREST request model shared by the HTTP transport and the in-memory store.

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// One call against a named collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub table: String,
    pub operation: Operation,
    /// Equality filters as (column, value).
    pub filters: Vec<(String, String)>,
    pub order: Vec<(String, Direction)>,
}

impl TableRequest {
    pub fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self {
            table: table.into(),
            operation,
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Query string pairs in PostgREST syntax.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if matches!(self.operation, Operation::Select) {
            pairs.push(("select".to_string(), "*".to_string()));
        }

        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{}", value)));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, direction)| format!("{}.{}", column, direction.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        pairs
    }
}

/// Authorization attached to every call made through one session.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    access_token: Option<String>,
}

impl Credentials {
    pub fn anonymous(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn for_user(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: Some(access_token.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Value for `Authorization: Bearer`. Without a user token the public
    /// key doubles as the bearer, which selects the anonymous role.
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_scoped", &self.access_token.is_some())
            .finish()
    }
}

/// Executes table requests against the store. Row filtering by identity is
/// the implementor's job, never the caller's.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        credentials: &Credentials,
        request: TableRequest,
    ) -> Result<Vec<Value>, StorageError>;
}

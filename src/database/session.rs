use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;

use super::error::StorageError;
use super::postgrest::{Credentials, Direction, Operation, TableRequest, Transport};
use crate::auth::AuthenticatedIdentity;

/// Handle to the store carrying one authorization context.
///
/// A user-scoped session belongs to a single request; only the base session
/// is shared.
pub struct ScopedSession {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl ScopedSession {
    fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub fn is_user_scoped(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    /// Start a query against `name`. Defaults to a select.
    pub fn table(&self, name: &str) -> TableQuery<'_> {
        TableQuery {
            session: self,
            request: TableRequest::new(name, Operation::Select),
        }
    }
}

impl std::fmt::Debug for ScopedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSession")
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Fluent builder over a [`TableRequest`], executed through its session.
#[must_use]
pub struct TableQuery<'a> {
    session: &'a ScopedSession,
    request: TableRequest,
}

impl<'a> TableQuery<'a> {
    pub fn select(mut self) -> Self {
        self.request.operation = Operation::Select;
        self
    }

    pub fn insert(mut self, row: Value) -> Self {
        self.request.operation = Operation::Insert(row);
        self
    }

    pub fn update(mut self, fields: Value) -> Self {
        self.request.operation = Operation::Update(fields);
        self
    }

    pub fn delete(mut self) -> Self {
        self.request.operation = Operation::Delete;
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.request.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.request.order.push((column.to_string(), direction));
        self
    }

    pub async fn execute(self) -> Result<Vec<Value>, StorageError> {
        self.session
            .transport
            .execute(&self.session.credentials, self.request)
            .await
    }
}

/// Hands out sessions: a memoized base session for anonymous access, and a
/// fresh session per verified identity.
///
/// User sessions are only built from an [`AuthenticatedIdentity`], so a token
/// cannot be scoped without first passing verification.
pub struct SessionFactory {
    transport: Arc<dyn Transport>,
    api_key: String,
    base: OnceCell<Arc<ScopedSession>>,
}

impl SessionFactory {
    pub fn new(transport: Arc<dyn Transport>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            base: OnceCell::new(),
        }
    }

    pub fn session(&self, identity: Option<&AuthenticatedIdentity>) -> Arc<ScopedSession> {
        match identity {
            Some(identity) => Arc::new(self.user_session(identity)),
            None => self.base(),
        }
    }

    /// Shared anonymous session, built on first use.
    pub fn base(&self) -> Arc<ScopedSession> {
        self.base
            .get_or_init(|| {
                Arc::new(ScopedSession::new(
                    self.transport.clone(),
                    Credentials::anonymous(self.api_key.clone()),
                ))
            })
            .clone()
    }

    /// New session bound to the identity's raw token. Never cached.
    pub fn user_session(&self, identity: &AuthenticatedIdentity) -> ScopedSession {
        ScopedSession::new(
            self.transport.clone(),
            Credentials::for_user(self.api_key.clone(), identity.raw_token()),
        )
    }
}

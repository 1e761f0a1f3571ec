use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

use super::error::StorageError;
use super::models::{NewTask, Task, TaskPatch};
use super::postgrest::Direction;
use super::session::ScopedSession;

pub const TASKS_TABLE: &str = "tasks";

/// CRUD over one collection, keyed by `id`.
///
/// Every call goes through the caller's [`ScopedSession`]; which rows are
/// visible is decided by the store, not here.
pub struct Repository<T> {
    table_name: &'static str,
    order_column: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Repository<T> {}

impl<T> Repository<T>
where
    T: DeserializeOwned,
{
    pub const fn new(table_name: &'static str, order_column: &'static str) -> Self {
        Self {
            table_name,
            order_column,
            _phantom: PhantomData,
        }
    }

    /// All visible rows, oldest first.
    pub async fn select_all(&self, session: &ScopedSession) -> Result<Vec<T>, StorageError> {
        let rows = session
            .table(self.table_name)
            .select()
            .order(self.order_column, Direction::Ascending)
            .execute()
            .await?;
        decode_rows(rows)
    }

    pub async fn select_one(&self, session: &ScopedSession, id: i64) -> Result<Option<T>, StorageError> {
        let rows = session
            .table(self.table_name)
            .select()
            .eq("id", id)
            .execute()
            .await?;
        first_row(rows)
    }

    pub async fn insert<B: Serialize>(&self, session: &ScopedSession, body: &B) -> Result<T, StorageError> {
        let rows = session
            .table(self.table_name)
            .insert(serde_json::to_value(body)?)
            .execute()
            .await?;
        first_row(rows)?.ok_or(StorageError::MissingRepresentation(self.table_name))
    }

    /// Writes `fields` to the row with `id`. `None` when no visible row matched.
    pub async fn update_one<B: Serialize>(
        &self,
        session: &ScopedSession,
        id: i64,
        fields: &B,
    ) -> Result<Option<T>, StorageError> {
        let rows = session
            .table(self.table_name)
            .update(serde_json::to_value(fields)?)
            .eq("id", id)
            .execute()
            .await?;
        first_row(rows)
    }

    /// `true` when a visible row was removed.
    pub async fn delete_one(&self, session: &ScopedSession, id: i64) -> Result<bool, StorageError> {
        let rows = session
            .table(self.table_name)
            .delete()
            .eq("id", id)
            .execute()
            .await?;
        Ok(!rows.is_empty())
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StorageError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StorageError::from))
        .collect()
}

fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, StorageError> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

pub type TaskRepository = Repository<Task>;

impl Default for TaskRepository {
    fn default() -> Self {
        Repository::new(TASKS_TABLE, "created_at")
    }
}

impl TaskRepository {
    pub async fn list(&self, session: &ScopedSession) -> Result<Vec<Task>, StorageError> {
        self.select_all(session).await
    }

    pub async fn create(&self, session: &ScopedSession, task: &NewTask) -> Result<Task, StorageError> {
        self.insert(session, task).await
    }

    pub async fn get(&self, session: &ScopedSession, id: i64) -> Result<Option<Task>, StorageError> {
        self.select_one(session, id).await
    }

    /// An empty patch performs no write and reads the current row instead.
    pub async fn update(
        &self,
        session: &ScopedSession,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StorageError> {
        if patch.is_empty() {
            return self.get(session, id).await;
        }
        self.update_one(session, id, patch).await
    }

    pub async fn delete(&self, session: &ScopedSession, id: i64) -> Result<bool, StorageError> {
        self.delete_one(session, id).await
    }
}

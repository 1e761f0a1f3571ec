use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A stored task. Ownership lives in the store and is never exposed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub completada: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a create request. Unknown fields, including any owner column,
/// are dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub completada: bool,
}

/// Partial update. Only fields present in the request body are written;
/// `descripcion: null` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub descripcion: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completada: Option<bool>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

fn check_titulo(titulo: &str) -> Result<(), ValidationError> {
    if titulo.trim().is_empty() {
        return Err(ValidationError {
            field: "titulo",
            message: "must not be empty",
        });
    }
    Ok(())
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_titulo(&self.titulo)
    }
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.titulo.is_none() && self.descripcion.is_none() && self.completada.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.titulo {
            Some(titulo) => check_titulo(titulo),
            None => Ok(()),
        }
    }
}

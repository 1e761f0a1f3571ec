pub mod error;
pub mod http;
pub mod models;
pub mod postgrest;
pub mod repository;
pub mod session;

pub use error::StorageError;
pub use http::HttpTransport;
pub use models::{NewTask, Task, TaskPatch, ValidationError};
pub use postgrest::{Credentials, Direction, Operation, TableRequest, Transport};
pub use repository::{Repository, TaskRepository};
pub use session::{ScopedSession, SessionFactory, TableQuery};

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::database::{SessionFactory, TaskRepository, Transport};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub sessions: Arc<SessionFactory>,
    pub tasks: TaskRepository,
}

impl AppState {
    pub fn new(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            verifier: Arc::new(TokenVerifier::from_config(&settings.security)),
            sessions: Arc::new(SessionFactory::new(transport, settings.store.anon_key.clone())),
            tasks: TaskRepository::default(),
        }
    }
}

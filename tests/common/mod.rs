#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use tasks_api::config::Settings;
use tasks_api::testing::{sign_token, InMemoryTransport};
use tasks_api::AppState;

pub const JWT_SECRET: &str = "integration-test-secret-of-decent-length";
pub const ANON_KEY: &str = "integration-anon-key";

pub fn settings(extra: &[(&str, &str)]) -> Settings {
    let mut vars: HashMap<String, String> = [
        ("SUPABASE_URL", "http://127.0.0.1:54321"),
        ("SUPABASE_ANON_KEY", ANON_KEY),
        ("SUPABASE_JWT_SECRET", JWT_SECRET),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Settings::from_lookup(|name| vars.get(name).cloned()).expect("test settings")
}

pub fn token_for(subject: &str) -> String {
    sign_token(JWT_SECRET, Some(subject)).expect("sign test token")
}

/// The assembled router over an in-memory store.
#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryTransport>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(settings(&[]))
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(InMemoryTransport::new(ANON_KEY, JWT_SECRET));
        let state = AppState::new(&settings, store.clone());
        let router = tasks_api::app(state, &settings);
        Self { router, store }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("failed to read response body")?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn create(&self, token: &str, titulo: &str) -> Result<Value> {
        let res = self
            .call(
                Method::POST,
                "/api/tasks",
                Some(token),
                Some(serde_json::json!({ "titulo": titulo })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {} {}", res.status, res.body);
        Ok(res.body)
    }
}

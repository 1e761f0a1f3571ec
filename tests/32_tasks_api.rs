mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use common::{token_for, TestApp};
use tasks_api::database::Operation;

fn id_of(task: &Value) -> i64 {
    task["id"].as_i64().expect("task id")
}

fn stamp(task: &Value, field: &str) -> DateTime<Utc> {
    task[field]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .expect("timestamp")
}

#[tokio::test]
async fn create_then_get_round_trip() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");

    let res = app
        .call(Method::POST, "/api/tasks/", Some(token.as_str()), Some(json!({ "titulo": "buy milk" })))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let created = res.body;
    assert_eq!(created["titulo"], "buy milk");
    assert_eq!(created["completada"], false);
    assert_eq!(created["descripcion"], Value::Null);
    assert!(created["created_at"].is_string());
    assert!(created["updated_at"].is_string());
    assert!(created.get("user_id").is_none(), "owner must not leak: {}", created);

    let id = id_of(&created);
    let res = app
        .call(Method::GET, &format!("/api/tasks/{}", id), Some(token.as_str()), None)
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, created);
    Ok(())
}

#[tokio::test]
async fn owner_comes_from_token_not_body() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");

    let res = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(token.as_str()),
            Some(json!({ "titulo": "mine", "user_id": "user-2", "owner": "user-2" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);

    let row = app.store.raw_row(id_of(&res.body)).await.expect("stored row");
    assert_eq!(row["user_id"], "user-1");

    let calls = app.store.calls().await;
    match &calls[0].request.operation {
        Operation::Insert(body) => {
            assert!(body.get("user_id").is_none());
            assert!(body.get("owner").is_none());
        }
        other => panic!("expected insert, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn create_with_all_fields() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");

    let res = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(token.as_str()),
            Some(json!({ "titulo": "write report", "descripcion": "quarterly", "completada": true })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["descripcion"], "quarterly");
    assert_eq!(res.body["completada"], true);
    Ok(())
}

#[tokio::test]
async fn create_rejects_invalid_bodies_without_touching_store() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");

    let res = app
        .call(Method::POST, "/api/tasks", Some(token.as_str()), Some(json!({ "titulo": "   " })))
        .await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["field_errors"]["titulo"], "must not be empty");

    let res = app
        .call(Method::POST, "/api/tasks", Some(token.as_str()), Some(json!({ "descripcion": "no title" })))
        .await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .send(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/tasks")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))?,
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "INVALID_JSON");

    assert!(app.store.calls().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_is_ordered_and_scoped() -> Result<()> {
    let app = TestApp::new();
    let alice = token_for("alice");
    let bob = token_for("bob");

    app.create(&alice, "first").await?;
    app.create(&bob, "bob's").await?;
    app.create(&alice, "second").await?;
    app.create(&alice, "third").await?;

    let res = app.call(Method::GET, "/api/tasks", Some(alice.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    let tasks = res.body.as_array().expect("array").clone();
    let titles: Vec<&str> = tasks.iter().filter_map(|t| t["titulo"].as_str()).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);

    for pair in tasks.windows(2) {
        assert!(stamp(&pair[0], "created_at") < stamp(&pair[1], "created_at"));
    }

    let res = app.call(Method::GET, "/api/tasks", Some(bob.as_str()), None).await?;
    assert_eq!(res.body.as_array().map(Vec::len), Some(1));

    let calls = app.store.calls().await;
    let last = &calls.last().expect("list call").request;
    assert_eq!(last.order.len(), 1);
    assert_eq!(last.order[0].0, "created_at");
    Ok(())
}

#[tokio::test]
async fn other_identity_cannot_see_or_touch_task() -> Result<()> {
    let app = TestApp::new();
    let u1 = token_for("user-1");
    let u2 = token_for("user-2");

    let task = app.create(&u1, "private").await?;
    let uri = format!("/api/tasks/{}", id_of(&task));

    let res = app.call(Method::GET, &uri, Some(u2.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], "NOT_FOUND");

    let res = app
        .call(Method::PUT, &uri, Some(u2.as_str()), Some(json!({ "titulo": "hijacked" })))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.call(Method::DELETE, &uri, Some(u2.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.call(Method::GET, &uri, Some(u1.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["titulo"], "private");
    Ok(())
}

#[tokio::test]
async fn empty_update_reads_without_writing() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let task = app.create(&token, "unchanged").await?;
    let uri = format!("/api/tasks/{}", id_of(&task));

    let res = app.call(Method::PUT, &uri, Some(token.as_str()), Some(json!({}))).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, task);

    let calls = app.store.calls().await;
    assert!(calls
        .iter()
        .all(|c| !matches!(c.request.operation, Operation::Update(_))));
    assert!(matches!(
        calls.last().map(|c| &c.request.operation),
        Some(Operation::Select)
    ));
    Ok(())
}

#[tokio::test]
async fn empty_update_on_missing_task_is_404() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let res = app
        .call(Method::PUT, "/api/tasks/4242", Some(token.as_str()), Some(json!({})))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn partial_update_writes_only_given_fields() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let res = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(token.as_str()),
            Some(json!({ "titulo": "laundry", "descripcion": "whites" })),
        )
        .await?;
    let task = res.body;
    let uri = format!("/api/tasks/{}", id_of(&task));

    let res = app
        .call(Method::PUT, &uri, Some(token.as_str()), Some(json!({ "completada": true })))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["completada"], true);
    assert_eq!(res.body["titulo"], "laundry");
    assert_eq!(res.body["descripcion"], "whites");
    assert_eq!(res.body["created_at"], task["created_at"]);
    assert!(stamp(&res.body, "updated_at") > stamp(&task, "updated_at"));

    let calls = app.store.calls().await;
    match &calls.last().expect("update call").request.operation {
        Operation::Update(body) => assert_eq!(body, &json!({ "completada": true })),
        other => panic!("expected update, got {:?}", other),
    }

    let res = app
        .call(Method::PUT, &uri, Some(token.as_str()), Some(json!({ "descripcion": null })))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["descripcion"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn update_rejects_blank_titulo() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let task = app.create(&token, "keep").await?;
    let res = app
        .call(
            Method::PUT,
            &format!("/api/tasks/{}", id_of(&task)),
            Some(token.as_str()),
            Some(json!({ "titulo": "" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_404() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let task = app.create(&token, "temporary").await?;
    let uri = format!("/api/tasks/{}", id_of(&task));

    let res = app.call(Method::DELETE, &uri, Some(token.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(res.body, Value::Null);

    let res = app.call(Method::GET, &uri, Some(token.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.call(Method::DELETE, &uri, Some(token.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    assert_eq!(app.store.row_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn non_numeric_id_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let token = token_for("user-1");
    let res = app.call(Method::GET, "/api/tasks/abc", Some(token.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.store.calls().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_identities_keep_their_credentials() -> Result<()> {
    let app = TestApp::new();
    let tokens: Vec<(String, String)> = (0..8)
        .map(|i| {
            let subject = format!("user-{}", i);
            let token = token_for(&subject);
            (subject, token)
        })
        .collect();

    let mut handles = Vec::new();
    for (subject, token) in tokens.clone() {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.create(&token, &format!("task of {}", subject)).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    for (subject, token) in &tokens {
        let res = app.call(Method::GET, "/api/tasks", Some(token.as_str()), None).await?;
        let titles: Vec<&str> = res
            .body
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|t| t["titulo"].as_str())
            .collect();
        assert_eq!(titles, vec![format!("task of {}", subject).as_str()]);
    }

    // Each insert carried exactly the caller's own token.
    let calls = app.store.calls().await;
    for call in calls.iter().filter(|c| matches!(c.request.operation, Operation::Insert(_))) {
        let body = match &call.request.operation {
            Operation::Insert(body) => body,
            _ => unreachable!(),
        };
        let subject = body["titulo"]
            .as_str()
            .and_then(|t| t.strip_prefix("task of "))
            .expect("title");
        let expected = &tokens.iter().find(|(s, _)| s == subject).expect("known subject").1;
        assert_eq!(&call.bearer, expected);
    }
    Ok(())
}

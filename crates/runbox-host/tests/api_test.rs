// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API contract tests.

mod common;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::TestContext;
use runbox_host::server::build_router;

async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is not JSON")
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

fn description_body(name: &str) -> Value {
    json!({
        "name": name,
        "runtime": "nodejs",
        "source": "function test(x) {return x + 1;} result = test(inputs.a);",
        "outputNames": ["result"],
        "resourceConstraints": {"timeoutSeconds": 10}
    })
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (status, body) = request_json(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_description_lifecycle() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (status, created) = request_json(
        app.clone(),
        post_json("/closure-descriptions", description_body("test")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().expect("assigned id").to_string();
    assert_eq!(created["runtime"], "nodejs");
    assert_eq!(created["resourceConstraints"]["timeoutSeconds"], 10);

    let (status, fetched) =
        request_json(app.clone(), get(&format!("/closure-descriptions/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "test");

    let (status, _) =
        request_json(app.clone(), delete(&format!("/closure-descriptions/{}", id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, problem) =
        request_json(app, get(&format!("/closure-descriptions/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "DESCRIPTION_NOT_FOUND");
}

#[tokio::test]
async fn test_description_requires_exactly_one_source() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let mut body = description_body("bad");
    body["sourceURL"] = json!("http://example.com/bundle.tar");

    let (status, problem) = request_json(app, post_json("/closure-descriptions", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "VALIDATION_ERROR");
    assert!(problem["message"].as_str().unwrap().contains("mutually exclusive"));
}

#[tokio::test]
async fn test_closure_execution_roundtrip() {
    let ctx = TestContext::new();
    let mut scripted = serde_json::Map::new();
    scripted.insert("result".to_string(), json!(4));
    ctx.adapter.script_outputs(scripted).await;

    let app = build_router(ctx.app_state());

    let (status, description) = request_json(
        app.clone(),
        post_json("/closure-descriptions", description_body("test")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let description_id = description["id"].as_str().unwrap();

    let (status, closure) = request_json(
        app.clone(),
        post_json("/closures", json!({"descriptionLink": description_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closure["state"], "CREATED");
    let closure_id = closure["id"].as_str().unwrap().to_string();

    let (status, snapshot) = request_json(
        app.clone(),
        post_json(
            &format!("/closures/{}", closure_id),
            json!({"inputs": {"a": 3}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Synchronous ack: execution is still in flight.
    assert!(matches!(
        snapshot["state"].as_str(),
        Some("CREATED") | Some("STARTED")
    ));

    // Observe the terminal state by polling, as an HTTP client would.
    let mut last = Value::Null;
    for _ in 0..200 {
        let (status, current) =
            request_json(app.clone(), get(&format!("/closures/{}", closure_id))).await;
        assert_eq!(status, StatusCode::OK);
        if current["state"] == "FINISHED" || current["state"] == "FAILED" {
            last = current;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(last["state"], "FINISHED");
    assert_eq!(last["outputs"]["result"], json!(4));
    assert_eq!(last["inputs"]["a"], json!(3));
}

#[tokio::test]
async fn test_closure_creation_rejects_dangling_description() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (status, problem) = request_json(
        app,
        post_json("/closures", json!({"descriptionLink": "no-such-description"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_closure_stats_side_channel() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (_, description) = request_json(
        app.clone(),
        post_json("/closure-descriptions", description_body("test")),
    )
    .await;
    let (_, closure) = request_json(
        app.clone(),
        post_json(
            "/closures",
            json!({"descriptionLink": description["id"].as_str().unwrap()}),
        ),
    )
    .await;

    let (status, stats) = request_json(
        app,
        get(&format!("/closures/{}/stats", closure["id"].as_str().unwrap())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["placement"], "local");
    assert!(stats["activeExecutions"].is_number());
}

#[tokio::test]
async fn test_closure_delete() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (_, description) = request_json(
        app.clone(),
        post_json("/closure-descriptions", description_body("test")),
    )
    .await;
    let (_, closure) = request_json(
        app.clone(),
        post_json(
            "/closures",
            json!({"descriptionLink": description["id"].as_str().unwrap()}),
        ),
    )
    .await;
    let closure_id = closure["id"].as_str().unwrap();

    let (status, _) = request_json(app.clone(), delete(&format!("/closures/{}", closure_id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, problem) = request_json(app, get(&format!("/closures/{}", closure_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "CLOSURE_NOT_FOUND");
}

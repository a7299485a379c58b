// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the batch description-creation endpoint.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::TestContext;
use runbox_core::ResourceStore;
use runbox_host::server::build_router;

async fn post_batch(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/closure-descriptions/batch")
        .header("content-type", "text/plain")
        .body(Body::from(body.to_string()))
        .expect("valid request");
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

fn document(name: &str) -> String {
    json!({
        "name": name,
        "runtime": "nodejs",
        "source": "result = inputs.a;",
        "outputNames": ["result"]
    })
    .to_string()
}

/// Parses fine but fails validation at creation time: both sources set.
fn failing_document(name: &str) -> String {
    json!({
        "name": name,
        "runtime": "nodejs",
        "source": "result = inputs.a;",
        "sourceURL": "http://example.com/src.tar"
    })
    .to_string()
}

#[tokio::test]
async fn test_batch_creates_all_in_order() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let body = format!("{}\n---\n{}\n---\n{}", document("a"), document("b"), document("c"));
    let (status, links) = post_batch(app, &body).await;

    assert_eq!(status, StatusCode::OK);
    let links = links.as_array().expect("link list");
    assert_eq!(links.len(), 3);

    // Input order is preserved.
    for (link, expected_name) in links.iter().zip(["a", "b", "c"]) {
        let description = ctx
            .store
            .get_description(link.as_str().unwrap())
            .await
            .unwrap()
            .expect("created description");
        assert_eq!(description.name, expected_name);
    }
}

#[tokio::test]
async fn test_batch_empty_body_is_rejected() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let (status, problem) = post_batch(app.clone(), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "VALIDATION_ERROR");
    assert!(problem["message"].as_str().unwrap().contains("body is required"));

    // Delimiters only is still an empty submission.
    let (status, _) = post_batch(app, "---\n---\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_partial_failure_compensates_all() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let body = format!(
        "{}\n---\n{}\n---\n{}",
        document("a"),
        failing_document("b"),
        document("c")
    );
    let (status, problem) = post_batch(app, &body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem["code"], "CREATE_FAILED");

    // Never a partial success: successfully created siblings are gone.
    assert_eq!(ctx.store.description_count().await, 0);
}

#[tokio::test]
async fn test_batch_malformed_document_mutates_nothing() {
    let ctx = TestContext::new();
    let app = build_router(ctx.app_state());

    let body = format!("{}\n---\nnot-json", document("a"));
    let (status, problem) = post_batch(app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "VALIDATION_ERROR");
    assert_eq!(ctx.store.description_count().await, 0);
}

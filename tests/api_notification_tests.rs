// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification recording and inbox tests.

use axum::http::StatusCode;
use chrono::Utc;
use pocket_trader::models::Rarity;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, request, seed, test_post};

#[tokio::test]
async fn test_notify_duplicate_and_inbox() {
    let (app, state, store) = common::create_test_app();
    seed(
        &store,
        &test_post("t1", "misty", "A1-001", &["A1-005"], Rarity::OneDiamond, Utc::now()),
    )
    .await;
    let ash = common::create_test_jwt("ash", &state.config.jwt_signing_key);
    let misty = common::create_test_jwt("misty", &state.config.jwt_signing_key);

    let notify = |name: &str| {
        request(
            "POST",
            "/api/trades/t1/notify",
            Some(&ash),
            Some(json!({ "notifier_username": name, "message": "Have a spare!" })),
        )
    };

    let response = app.clone().oneshot(notify("Ash")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["user_id"], "misty");
    assert_eq!(created["is_read"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(notify("Ash")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "duplicate_notification");

    let response = app.clone().oneshot(notify("Brock")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Only the recipient may mark it read
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/notifications/{}/read", id),
            Some(&ash),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/notifications/{}/read", id),
            Some(&misty),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["is_read"], true);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/notifications?unread_only=true",
            Some(&misty),
            None,
        ))
        .await
        .unwrap();
    let unread = body_json(response).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
    assert_eq!(unread[0]["notifier_username"], "Brock");

    let response = app
        .oneshot(request("GET", "/api/dashboard", Some(&misty), None))
        .await
        .unwrap();
    let dashboard = body_json(response).await;
    assert_eq!(dashboard["active_count"], 1);
    assert_eq!(dashboard["recent_notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_notify_missing_listing_and_bad_input() {
    let (app, state, store) = common::create_test_app();
    seed(
        &store,
        &test_post("t1", "misty", "A1-001", &["A1-005"], Rarity::OneDiamond, Utc::now()),
    )
    .await;
    let ash = common::create_test_jwt("ash", &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/trades/nope/notify",
            Some(&ash),
            Some(json!({ "notifier_username": "" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/trades/t1/notify",
            Some(&ash),
            Some(json!({ "notifier_username": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "notifier_username");

    let response = app
        .oneshot(request(
            "POST",
            "/api/trades/t1/notify",
            Some(&ash),
            Some(json!({ "notifier_username": "Ash", "message": "x".repeat(201) })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "message");
}

#[tokio::test]
async fn test_mark_read_unknown_notification() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt("misty", &state.config.jwt_signing_key);

    let response = app
        .oneshot(request(
            "POST",
            "/api/notifications/does-not-exist/read",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_cannot_notify_own_listing() {
    let (app, state, store) = common::create_test_app();
    seed(
        &store,
        &test_post("t1", "misty", "A1-001", &["A1-005"], Rarity::OneDiamond, Utc::now()),
    )
    .await;
    let misty = common::create_test_jwt("misty", &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/trades/t1/notify",
            Some(&misty),
            Some(json!({ "notifier_username": "Misty" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    let response = app
        .oneshot(request(
            "GET",
            "/api/notifications",
            Some(&misty),
            None,
        ))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

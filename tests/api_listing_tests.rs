// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trade listing lifecycle and feed tests through the HTTP API.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pocket_trader::db::TradeStore;
use pocket_trader::models::Rarity;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, request, seed, test_post};

#[tokio::test]
async fn test_pagination_25_items_page_size_10() {
    let (app, _, store) = common::create_test_app();
    let now = Utc::now();
    for i in 0..25 {
        let post = test_post(
            &format!("t{:02}", i),
            "misty",
            "A1-001",
            &["A1-005"],
            Rarity::OneDiamond,
            now - Duration::minutes(i),
        );
        seed(&store, &post).await;
    }

    let mut sizes = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for page in 1..=3 {
        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/trades?page={}&page_size=10", page),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total_count"], 25);
        assert_eq!(body["total_pages"], 3);
        let items = body["items"].as_array().unwrap();
        sizes.push(items.len());
        for item in items {
            let id = item["id"].as_str().unwrap().to_string();
            assert!(seen.insert(id.clone()), "{} appears on more than one page", id);
        }

        if page == 1 {
            // Most recently refreshed first
            assert_eq!(body["items"][0]["id"], "t00");
        }
    }
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn test_default_page_size_from_config() {
    let (app, state, store) = common::create_test_app();
    let now = Utc::now();
    for i in 0..12 {
        let post = test_post(
            &format!("t{}", i),
            "misty",
            "A1-001",
            &["A1-005"],
            Rarity::OneDiamond,
            now - Duration::minutes(i),
        );
        seed(&store, &post).await;
    }

    let response = app
        .oneshot(request("GET", "/api/trades", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(
        body["items"].as_array().unwrap().len() as u32,
        state.config.page_size
    );
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn test_rarity_filter_uses_listing_field() {
    let (app, _, store) = common::create_test_app();
    let now = Utc::now();
    seed(
        &store,
        &test_post("one", "misty", "A1-001", &["A1-005"], Rarity::OneDiamond, now),
    )
    .await;
    // Stored rarity disagrees with the cards; the filter trusts the field
    seed(
        &store,
        &test_post("odd", "misty", "A1-001", &["A1-005"], Rarity::ThreeDiamond, now),
    )
    .await;

    let response = app
        .oneshot(request("GET", "/api/trades?rarity=3-diamond", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "odd");
    assert_eq!(body["total_count"], 1);
}

#[tokio::test]
async fn test_card_filter_matches_wanted_or_offered() {
    let (app, _, store) = common::create_test_app();
    let now = Utc::now();
    seed(
        &store,
        &test_post("wants", "misty", "A1-094", &["A1-005"], Rarity::OneDiamond, now),
    )
    .await;
    seed(
        &store,
        &test_post(
            "offers",
            "misty",
            "A1-001",
            &["A1-006", "A1-094"],
            Rarity::OneDiamond,
            now - Duration::minutes(1),
        ),
    )
    .await;
    seed(
        &store,
        &test_post("neither", "misty", "A1-001", &["A1-005"], Rarity::OneDiamond, now),
    )
    .await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/trades?card_number=A1-094", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["wants", "offers"]);

    // Unknown card: empty page, not an error
    let response = app
        .oneshot(request("GET", "/api/trades?card_number=ZZZ-999", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["total_pages"], 0);
}

#[tokio::test]
async fn test_feed_joins_owner_and_card_details() {
    let (app, _, store) = common::create_test_app();
    store.upsert_user(&common::test_user("misty")).await.unwrap();
    seed(
        &store,
        &test_post(
            "t1",
            "misty",
            "A1-094",
            &["A1-005"],
            Rarity::OneDiamond,
            Utc::now(),
        ),
    )
    .await;

    let response = app
        .oneshot(request("GET", "/api/trades", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let item = &body["items"][0];
    assert_eq!(item["user"]["id"], "misty");
    assert_eq!(item["user"]["friend_code"], "1234567812345678");
    assert_eq!(item["card_wanted_details"]["name"], "Pikachu");
    assert_eq!(item["cards_for_trade_details"][0]["name"], "Caterpie");
    assert_eq!(item["status"], "active");
}

#[tokio::test]
async fn test_invalid_page_and_rarity_rejected() {
    let (app, _, _) = common::create_test_app();

    for uri in [
        "/api/trades?page=0",
        "/api/trades?page_size=0",
        "/api/trades?rarity=legendary",
    ] {
        let response = app.clone().oneshot(request("GET", uri, None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_create_refresh_complete_flow() {
    let (app, state, store) = common::create_test_app();
    let ash = common::create_test_jwt("ash", &state.config.jwt_signing_key);
    let gary = common::create_test_jwt("gary", &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/trades",
            Some(&ash),
            Some(json!({
                "card_wanted": "A1-094",
                "cards_for_trade": ["A1-001", "A1-005"],
                "rarity": "1-diamond"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["is_active"], true);

    // Fresh listing can't be refreshed yet
    let response = app
        .clone()
        .oneshot(request("POST", &format!("/api/trades/{}/refresh", id), Some(&ash), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Age it past the threshold and sweep
    let mut post = store.get_trade_post(&id).await.unwrap().unwrap();
    post.last_refreshed = Utc::now() - Duration::hours(6) - Duration::minutes(1);
    store.insert_trade_post(&post).await.unwrap();
    let response = app
        .clone()
        .oneshot(request("GET", "/api/trades", None, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total_count"], 0);
    assert!(!store.get_trade_post(&id).await.unwrap().unwrap().is_active);

    let response = app
        .clone()
        .oneshot(request("POST", &format!("/api/trades/{}/refresh", id), Some(&gary), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    let response = app
        .clone()
        .oneshot(request("POST", &format!("/api/trades/{}/refresh", id), Some(&ash), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    assert_eq!(refreshed["is_active"], true);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request("POST", &format!("/api/trades/{}/complete", id), Some(&ash), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let done = body_json(response).await;
        assert_eq!(done["is_completed"], true);
        assert_eq!(done["is_active"], false);
    }

    let response = app
        .oneshot(request("GET", "/api/my/trades", Some(&ash), None))
        .await
        .unwrap();
    let mine = body_json(response).await;
    assert_eq!(mine["completed"].as_array().unwrap().len(), 1);
    assert!(mine["active"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_with_unknown_card_is_not_found() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt("ash", &state.config.jwt_signing_key);

    let response = app
        .oneshot(request(
            "POST",
            "/api/trades",
            Some(&token),
            Some(json!({
                "card_wanted": "ZZZ-999",
                "cards_for_trade": ["A1-005"],
                "rarity": "1-diamond"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backend_unavailable_maps_to_503() {
    let (app, state) = common::create_offline_app();
    let token = common::create_test_jwt("ash", &state.config.jwt_signing_key);

    let response = app
        .oneshot(request(
            "POST",
            "/api/trades/t1/complete",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "backend_unavailable");
}

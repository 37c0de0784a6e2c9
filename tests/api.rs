//! Router-level tests driving the full application over the in-memory
//! store and rule-based capabilities.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use spendwise_gateway::advisor::Advisor;
use spendwise_gateway::app_state::AppState;
use spendwise_gateway::build_app;
use spendwise_gateway::persistence::InMemoryStore;
use spendwise_gateway::service::{InsightService, RewardService, TransactionService};

async fn app() -> Router {
    let store = Arc::new(InMemoryStore::new());
    let rewards = Arc::new(RewardService::new(
        Arc::<InMemoryStore>::clone(&store),
        Arc::<InMemoryStore>::clone(&store),
        Arc::<InMemoryStore>::clone(&store),
    ));
    if rewards.seed_default_catalog().await.is_err() {
        panic!("seeding failed");
    }
    let state = AppState {
        rewards,
        insights: Arc::new(InsightService::new(
            Arc::<InMemoryStore>::clone(&store),
            Advisor::rules_only(),
        )),
        transactions: Arc::new(TransactionService::new(store)),
    };
    build_app(state, Duration::from_secs(5))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(json) => request.body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("bad request");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router failed");
    };
    let status = response.status();
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn record_march(app: &Router, owner: &str) {
    let body = json!({
        "ownerId": owner,
        "transactions": [
            {"amount": 2500, "kind": "expense", "description": "SWIGGY", "occurredAt": "2025-03-05T10:00:00Z"},
            {"amount": 1500, "kind": "expense", "category": "Rent", "occurredAt": "2025-03-20T10:00:00Z"},
            {"amount": 9000, "kind": "income", "occurredAt": "2025-01-01T10:00:00Z"},
            {"amount": 10000, "kind": "income", "occurredAt": "2025-02-01T10:00:00Z"},
            {"amount": 11000, "kind": "income", "occurredAt": "2025-03-01T10:00:00Z"}
        ]
    });
    let (status, out) = call(app, Method::POST, "/api/v1/transactions", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(out["recorded"], 5);
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn catalog_lists_one_reward_per_tier() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/config/rewards", None).await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body
        .as_array()
        .map(|a| a.iter().filter_map(|d| d["code"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(codes, vec!["FOOD50", "MOVIE10", "SHOP100"]);
}

#[tokio::test]
async fn evaluate_issue_list_redeem_flow() {
    let app = app().await;
    record_march(&app, "alice").await;

    let evaluate = json!({"ownerId": "alice", "month": "3", "year": 2025});
    let (status, first) =
        call(&app, Method::POST, "/api/v1/rewards/evaluate", Some(evaluate.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["eligible"], true);
    assert_eq!(first["tier"], "gold");
    assert_eq!(first["outcome"], "issued");
    assert_eq!(first["coupon"]["code"], "FOOD50");
    assert_eq!(first["totalExpense"].as_f64(), Some(4000.0));
    assert_eq!(first["monthlyBudget"].as_f64(), Some(10000.0));

    let (_, second) = call(&app, Method::POST, "/api/v1/rewards/evaluate", Some(evaluate)).await;
    assert_eq!(second["outcome"], "already_active");
    assert_eq!(second["userCouponId"], first["userCouponId"]);

    let (status, listed) = call(&app, Method::GET, "/api/v1/rewards/user/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["status"], "active");
    assert_eq!(listed[0]["reward"]["code"], "FOOD50");

    let redeem = json!({"ownerId": "alice", "userCouponId": first["userCouponId"]});
    let (status, redeemed) =
        call(&app, Method::POST, "/api/v1/rewards/redeem", Some(redeem.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redeemed["ok"], true);
    assert_eq!(redeemed["status"], "used");

    let (status, again) = call(&app, Method::POST, "/api/v1/rewards/redeem", Some(redeem)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"]["code"], 2101);
}

#[tokio::test]
async fn redeem_of_someone_elses_reward_is_not_found() {
    let app = app().await;
    record_march(&app, "alice").await;
    let (_, issued) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/evaluate",
        Some(json!({"ownerId": "alice", "month": 3, "year": 2025})),
    )
    .await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/redeem",
        Some(json!({"ownerId": "mallory", "issuedRewardId": issued["userCouponId"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn evaluate_validates_input() {
    let app = app().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/evaluate",
        Some(json!({"ownerId": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/evaluate",
        Some(json!({"ownerId": "alice", "month": 13})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1002);
}

#[tokio::test]
async fn overspender_is_not_eligible() {
    let app = app().await;
    record_march(&app, "alice").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/evaluate",
        Some(json!({"ownerId": "alice", "month": 3, "year": 2025, "monthlyBudget": 4000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], false);
    assert_eq!(body["reason"], "Not within reward thresholds");
    assert!(body.get("coupon").is_none());
}

#[tokio::test]
async fn microscopic_budget_is_answered_not_crashed() {
    let app = app().await;
    record_march(&app, "alice").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/rewards/evaluate",
        Some(json!({"ownerId": "alice", "month": 3, "year": 2025, "monthlyBudget": 1e-20})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], false);
    assert_eq!(body["outcome"], "not_eligible");
}

#[tokio::test]
async fn categorize_falls_back_to_rules() {
    let app = app().await;
    let body = json!({"items": [
        {"index": 0, "description": "ZOMATO", "amount": 300},
        {"index": 1, "description": "APOLLO PHARMACY", "amount": 120},
        {"index": 2, "description": "???", "amount": 5}
    ]});
    let (status, out) = call(&app, Method::POST, "/api/v1/ai/categorize", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["source"], "rules");
    let categories: Vec<&str> = out["categories"]
        .as_array()
        .map(|a| a.iter().filter_map(|c| c["category"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(categories, vec!["Food", "Medical", "Other"]);
}

#[tokio::test]
async fn categorize_requires_items_or_owner() {
    let app = app().await;
    let (status, _) = call(&app, Method::POST, "/api/v1/ai/categorize", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn insights_summarize_window() {
    let app = app().await;
    record_march(&app, "alice").await;
    let (status, out) = call(
        &app,
        Method::POST,
        "/api/v1/ai/insights",
        Some(json!({"ownerId": "alice", "from": "2025-03-01", "to": "2025-03-31"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["totalExpense"].as_f64(), Some(4000.0));
    assert_eq!(out["summary"]["Food"].as_f64(), Some(2500.0));
    assert_eq!(out["advice"]["problems"][0], "Food");
    assert_eq!(out["source"], "rules");
}

#[tokio::test]
async fn festival_and_event_planners() {
    let app = app().await;
    let (status, out) = call(
        &app,
        Method::POST,
        "/api/v1/ai/festival",
        Some(json!({"festivalDate": "2025-11-01", "startDate": "2025-10-01", "desiredBudget": 5000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["plan"]["weeks"].as_array().map(Vec::len), Some(5));
    assert_eq!(out["plan"]["weeks"][0]["targetSave"].as_f64(), Some(1000.0));

    let (status, out) = call(
        &app,
        Method::POST,
        "/api/v1/ai/event",
        Some(json!({"eventName": "Diwali party", "attendeesCount": 12, "desiredBudget": 2000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["budget"]["Venue"].as_f64(), Some(600.0));
    assert_eq!(
        out["notes"],
        "Estimated split for Diwali party for 12 attendees. Adjust based on local prices."
    );
}

#[tokio::test]
async fn transactions_list_respects_bounds() {
    let app = app().await;
    record_march(&app, "alice").await;
    let (status, out) = call(
        &app,
        Method::GET,
        "/api/v1/transactions/alice?from=2025-03-01&to=2025-03-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<f64> = out
        .as_array()
        .map(|a| a.iter().filter_map(|t| t["amount"].as_f64()).collect())
        .unwrap_or_default();
    assert_eq!(amounts, vec![1500.0, 2500.0, 11000.0]);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/transactions/alice?from=not-a-date",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

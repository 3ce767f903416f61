// End-to-end experiment flow over the HTTP surface: registration, order
// submission across rounds, persisted results, token balances.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use auction_lab::database::MIGRATOR;
use auction_lab::database::repository::SqliteStore;
use auction_lab::services::RoundCoordinator;
use auction_lab::{AppState, Config, app};

async fn test_app(total_rounds: u32) -> Router {
    // Single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let coordinator = Arc::new(
        RoundCoordinator::recover(store.clone(), total_rounds)
            .await
            .unwrap(),
    );

    let config = Config {
        environment: "test".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        total_rounds,
        log_level: "info".to_string(),
    };

    app(AppState {
        db: pool,
        config,
        store,
        coordinator,
    })
}

async fn request(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register_four(app: &Router) {
    for (first, last) in [
        ("Alice", "Anders"),
        ("Bob", "Berg"),
        ("Carol", "Chen"),
        ("Dan", "Diaz"),
    ] {
        let (status, body) = request(
            app,
            "POST",
            "/api/auction/register",
            Some(json!({ "first_name": first, "last_name": last })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "registration failed: {body}");
    }
}

async fn submit(app: &Router, participant: &str, price: f64, quantity: i64, side: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/api/auction/orders",
        Some(json!({
            "participant_id": participant,
            "orders": [{ "price": price, "quantity": quantity, "side": side }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "submission failed: {body}");
    body
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(8).await;
    let (status, body) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_registration_assigns_roles_in_order() {
    let app = test_app(8).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "Alice", "last_name": "Anders" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participant_id"], "b1");
    assert_eq!(body["role"], "buyer1");
    assert_eq!(body["initial_money"], 100.0);

    let (_, second) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "Bob", "last_name": "Berg" })),
    )
    .await;
    assert_eq!(second["participant_id"], "b2");

    let (_, third) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "Carol", "last_name": "Chen" })),
    )
    .await;
    assert_eq!(third["participant_id"], "s1");
    assert_eq!(third["endowment"], 14.0);

    let (_, fourth) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "Dan", "last_name": "Diaz" })),
    )
    .await;
    assert_eq!(fourth["participant_id"], "s2");

    // Fifth registration is refused, the session is full
    let (status, body) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "Eve", "last_name": "Extra" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "RES_4002");
}

#[tokio::test]
async fn test_registration_validates_names() {
    let app = test_app(8).await;
    let (status, _) = request(
        &app,
        "POST",
        "/api/auction/register",
        Some(json!({ "first_name": "", "last_name": "Anders" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_two_round_experiment() {
    let app = test_app(2).await;
    register_four(&app).await;

    // Round 1: three waiting submissions, the fourth clears the round
    let first = submit(&app, "b1", 10.0, 5, "bid").await;
    assert_eq!(first["status"], "waiting");
    assert_eq!(first["round_number"], 1);

    assert_eq!(submit(&app, "b2", 9.0, 3, "bid").await["status"], "waiting");
    assert_eq!(submit(&app, "s1", 7.0, 4, "ask").await["status"], "waiting");

    let cleared = submit(&app, "s2", 8.0, 6, "ask").await;
    assert_eq!(cleared["status"], "cleared");
    assert_eq!(cleared["round_info"]["round_number"], 1);
    assert_eq!(cleared["round_info"]["uniform_price"], 8.5);
    assert_eq!(cleared["round_info"]["total_quantity"], 8);
    assert_eq!(cleared["participant_result"]["executed_quantity"], 4);
    assert_eq!(cleared["participant_result"]["profit"], 4.0);
    assert_eq!(cleared["final"], false);

    // A late resubmission for round 1 lands in round 2 as a fresh set,
    // so duplicates are only duplicates within the open round
    let dup = submit(&app, "b1", 4.0, 5, "bid").await;
    assert_eq!(dup["status"], "waiting");
    assert_eq!(dup["round_number"], 2);
    let dup_again = submit(&app, "b1", 4.0, 5, "bid").await;
    assert_eq!(dup_again["status"], "duplicate");

    // Round 1 results are served from the persisted records
    let (status, result) = request(
        &app,
        "GET",
        "/api/auction/rounds/1/result?participant_id=b1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["uniform_price"], 8.5);
    assert_eq!(result["executed_quantity"], 5);
    assert_eq!(result["profit"], -4.5);

    let (_, s1_result) = request(
        &app,
        "GET",
        "/api/auction/rounds/1/result?participant_id=s1",
        None,
    )
    .await;
    assert_eq!(s1_result["profit"], 18.0);

    // An uncleared round has no result yet
    let (status, _) = request(
        &app,
        "GET",
        "/api/auction/rounds/2/result?participant_id=b1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Round 2: no bid meets any ask, the round clears with the sentinel
    assert_eq!(submit(&app, "b2", 3.0, 5, "bid").await["status"], "waiting");
    assert_eq!(submit(&app, "s1", 6.0, 5, "ask").await["status"], "waiting");
    let last = submit(&app, "s2", 7.0, 5, "ask").await;
    assert_eq!(last["status"], "cleared");
    assert_eq!(last["round_info"]["uniform_price"], 0.0);
    assert_eq!(last["round_info"]["total_quantity"], 0);
    assert_eq!(last["final"], true);

    // The auction is over; further submissions are refused, not errors
    let refused = submit(&app, "b1", 10.0, 5, "bid").await;
    assert_eq!(refused["status"], "rejected");

    // Token balances accumulate round profits: b1 = -4.5 + 0
    let (_, tokens) = request(&app, "GET", "/api/auction/participants/b1/tokens", None).await;
    assert_eq!(tokens["total_tokens"], -4.5);
    let (_, s1_tokens) = request(&app, "GET", "/api/auction/participants/s1/tokens", None).await;
    assert_eq!(s1_tokens["total_tokens"], 18.0);
}

#[tokio::test]
async fn test_order_validation_over_http() {
    let app = test_app(8).await;
    register_four(&app).await;

    // Zero quantity
    let (status, body) = request(
        &app,
        "POST",
        "/api/auction/orders",
        Some(json!({
            "participant_id": "b1",
            "orders": [{ "price": 5.0, "quantity": 0, "side": "bid" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Empty order set
    let (status, _) = request(
        &app,
        "POST",
        "/api/auction/orders",
        Some(json!({ "participant_id": "b1", "orders": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown participant
    let (status, _) = request(
        &app,
        "POST",
        "/api/auction/orders",
        Some(json!({
            "participant_id": "ghost",
            "orders": [{ "price": 5.0, "quantity": 1, "side": "bid" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing was recorded for the round
    let dup = submit(&app, "b1", 5.0, 1, "bid").await;
    assert_eq!(dup["status"], "waiting");
}

#[tokio::test]
async fn test_participant_info_and_survey() {
    let app = test_app(8).await;
    register_four(&app).await;

    let (status, info) = request(&app, "GET", "/api/auction/participants/s2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["role"], "seller2");
    assert_eq!(info["endowment"], 16.0);
    assert_eq!(info["mv_first"], 8.0);
    assert!(info["profit_rule"].as_str().unwrap().contains("sold"));

    let (status, _) = request(&app, "GET", "/api/auction/participants/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(
        &app,
        "POST",
        "/api/auction/survey",
        Some(json!({
            "participant_id": "b1",
            "answer1": "clear instructions",
            "answer2": "more rounds please",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = request(
        &app,
        "POST",
        "/api/auction/survey",
        Some(json!({ "participant_id": "ghost", "answer1": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

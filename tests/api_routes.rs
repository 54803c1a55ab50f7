use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use budgetlytic::BudgetError;
use budgetlytic::db::BudgetStorage;
use budgetlytic::google::storage::BlobStore;
use budgetlytic::google::vision::TextDetector;
use budgetlytic::router::{BudgetState, budget_router};
use budgetlytic::service::{Categorizer, Clock};
use chrono::FixedOffset;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const RECEIPT: &str = "CITY CAFE\nBill No: 88\nPizza Margherita ₹ 320\nCold coffee Rs 140\nTotal ₹ 460\n";

struct FixedOcr(&'static str);

#[async_trait]
impl TextDetector for FixedOcr {
    async fn detect_text(&self, _image: &[u8]) -> Result<String, BudgetError> {
        Ok(self.0.to_string())
    }
}

struct MemoryBlobs;

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(
        &self,
        object: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BudgetError> {
        Ok(format!("https://storage.googleapis.com/demo.appspot.com/{object}"))
    }
}

async fn test_app(api_key: Option<&str>) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let database_url = format!("sqlite:{}", dir.path().join("budget.sqlite").display());
    let storage = BudgetStorage::connect(&database_url)
        .await
        .expect("failed to open sqlite");
    let categories_file = dir.path().join("categories.json");
    let categorizer = Categorizer::load(&categories_file)
        .await
        .expect("failed to load categories");
    let clock = Clock::new(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap());

    let state = BudgetState::new(
        storage,
        categorizer,
        categories_file,
        Arc::new(FixedOcr(RECEIPT)),
        Arc::new(MemoryBlobs),
        clock,
        api_key.map(str::to_string),
    );
    (budget_router(state), dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("response body was not json")
    };
    (status, value)
}

#[tokio::test]
async fn health_is_open() {
    let (app, _dir) = test_app(Some("pwd")).await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_key_guards_every_other_route() {
    let (app, _dir) = test_app(Some("pwd")).await;

    let (status, body) = send(&app, get("/expenses/u1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let authed = Request::builder()
        .uri("/expenses/u1")
        .header("x-api-key", "pwd")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, authed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(&app, get("/categories?key=pwd")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn manual_expenses_feed_listing_and_insights() {
    let (app, _dir) = test_app(None).await;

    let (status, body) = send(&app, get("/insights/u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No data");

    for (category, amount) in [("Food", 120.0), ("Transport", 80.0), ("Food", 30.5)] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/add_expense",
                json!({"user_id": "u1", "category": category, "amount": amount, "note": "test"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Expense added!");
    }

    let (status, body) = send(&app, get("/expenses/u1")).await;
    assert_eq!(status, StatusCode::OK);
    let expenses = body.as_array().expect("expenses array");
    assert_eq!(expenses.len(), 3);
    assert!(expenses.iter().all(|e| e["type"] == "manual"));

    let (status, body) = send(&app, get("/insights/u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_expenses"], 3);
    assert_eq!(body["total_spent"], 230.5);
    assert_eq!(body["categorywise"][0]["category"], "Food");

    let (_, other) = send(&app, get("/expenses/u2")).await;
    assert_eq!(other, json!([]));
}

#[tokio::test]
async fn invalid_expense_is_rejected() {
    let (app, _dir) = test_app(None).await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/add_expense",
            json!({"user_id": "u1", "category": "Food", "amount": -5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/add_expense",
            json!({"user_id": "u1", "category": "  ", "amount": 10}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn voice_transcript_becomes_expense() {
    let (app, _dir) = test_app(None).await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/voice_expense",
            json!({"user_id": "u1", "transcript": "Paid 450 for dinner at the hotel"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], "Dinner");
    assert_eq!(body["amount"], 450.0);

    let (_, body) = send(&app, get("/expenses/u1")).await;
    assert_eq!(body[0]["type"], "voice");
    assert_eq!(body[0]["note"], "Paid 450 for dinner at the hotel");

    let (status, _) = send(
        &app,
        json_request("POST", "/voice_expense", json!({"transcript": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn categories_can_be_suggested_and_extended() {
    let (app, dir) = test_app(None).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/categories/suggest",
            json!({"text": "uber ride to the airport", "top_n": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["category"], "Transport");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/categories",
            json!({"name": "Pets", "emoji": "🐶", "keywords": ["vet", "kibble"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Pets");
    assert!(dir.path().join("categories.json").exists());

    let (status, _) = send(
        &app,
        json_request("POST", "/categories", json!({"name": "Pets"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(
        &app,
        json_request("POST", "/categories/suggest", json!({"text": "kibble 2kg"})),
    )
    .await;
    assert_eq!(body[0]["category"], "Pets");

    let (_, body) = send(&app, get("/categories")).await;
    assert!(body.as_array().unwrap().iter().any(|c| c["name"] == "Pets"));
}

#[tokio::test]
async fn reminders_lifecycle() {
    let (app, _dir) = test_app(None).await;

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/reminders/u1",
            json!({"message": "Pay rent", "remind_at": "2099-01-01T09:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["remind_at"], "2099-01-01T09:00:00+05:30");
    assert_eq!(created["sent"], false);

    let (status, body) = send(&app, get("/reminders/u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let id = created["id"].as_i64().unwrap();
    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/reminders/u1/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let again = Request::builder()
        .method("DELETE")
        .uri(format!("/reminders/u1/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, again).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/reminders/u1",
            json!({"message": "Pay rent", "remind_at": "next tuesday"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upcoming_reminders_exclude_past_and_sort_ascending() {
    let (app, _dir) = test_app(None).await;
    for (message, remind_at) in [
        ("later", "2099-03-01T09:00"),
        ("past", "2001-01-01T09:00"),
        ("sooner", "2099-01-01T09:00"),
    ] {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/reminders/u1",
                json!({"message": message, "remind_at": remind_at}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, get("/reminders/u1")).await;
    let messages: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, ["sooner", "later"]);
}

#[tokio::test]
async fn push_token_registration() {
    let (app, _dir) = test_app(None).await;
    let (status, _) = send(
        &app,
        json_request("POST", "/push_token/u1", json!({"token": "device-token"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request("POST", "/push_token/u1", json!({"token": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart_request(filename: &str, user_id: &str) -> Request<Body> {
    let boundary = "budgetlytic-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"user_id\"\r\n\r\n\
         {user_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         not-really-an-image\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/upload_bill")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("failed to build request")
}

#[tokio::test]
async fn bill_upload_runs_ocr_and_itemizes() {
    let (app, _dir) = test_app(None).await;

    let (status, body) = send(&app, multipart_request("receipt.jpg", "u1")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["img_url"],
        "https://storage.googleapis.com/demo.appspot.com/uploads/u1/receipt.jpg"
    );
    assert_eq!(body["ocr_text"], RECEIPT);
    assert_eq!(body["category"], "Food & Dining");

    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["amount"], 320.0);
    assert_eq!(items[1]["amount"], 140.0);

    let (_, bills) = send(&app, get("/bills/u1")).await;
    assert_eq!(bills.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bill_upload_rejects_other_file_types() {
    let (app, _dir) = test_app(None).await;
    let (status, body) = send(&app, multipart_request("receipt.pdf", "u1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn oversized_body_returns_413() {
    let (app, _dir) = test_app(None).await;
    let note = "a".repeat(11 * 1024 * 1024);
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/add_expense",
            json!({"category": "Food", "amount": 1, "note": note}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

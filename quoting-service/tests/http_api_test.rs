//! HTTP surface integration tests.

mod common;

use common::TestApp;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

fn amount(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("amounts are serialized as strings"))
        .expect("amount is a decimal")
}

async fn create_quote(app: &TestApp) -> Value {
    let response = app
        .client
        .post(app.url("/documents"))
        .header("x-user-id", "alice")
        .json(&json!({ "client_reference": "ACME" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse JSON")
}

async fn add_line(app: &TestApp, document_id: &str, body: Value) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/documents/{}/lines", document_id)))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

async fn change_status(app: &TestApp, document_id: &str, status: &str) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/documents/{}/status", document_id)))
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "quoting-service");
}

#[tokio::test]
async fn readiness_and_metrics_work() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/ready")).send().await.unwrap();
    assert!(response.status().is_success());

    create_quote(&app).await;

    let response = app.client.get(app.url("/metrics")).send().await.unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("quoting_operations_total"));
    assert!(body.contains("quoting_http_requests_total"));
}

#[tokio::test]
async fn quote_lifecycle_over_http() {
    let app = TestApp::spawn().await;

    let quote = create_quote(&app).await;
    let id = quote["id"].as_str().unwrap().to_string();
    assert_eq!(quote["status"], "draft");
    assert_eq!(quote["number_is_final"], false);
    assert_eq!(quote["created_by"], "alice");

    let response = add_line(
        &app,
        &id,
        json!({
            "concept": "Consulting",
            "quantity": "2",
            "unit_price": "100.00",
            "discount_percent": "10",
            "tax_rate": "21"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let line: Value = response.json().await.unwrap();
    assert_eq!(amount(&line["subtotal"]), Decimal::new(18000, 2));
    assert_eq!(amount(&line["tax_amount"]), Decimal::new(3780, 2));
    assert_eq!(amount(&line["total"]), Decimal::new(21780, 2));

    let response = app
        .client
        .get(app.url(&format!("/documents/{}/tax-breakdown", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let totals: Value = response.json().await.unwrap();
    assert_eq!(amount(&totals["total"]), Decimal::new(21780, 2));
    assert_eq!(totals["tax_breakdown"].as_array().unwrap().len(), 1);

    let response = change_status(&app, &id, "sent").await;
    assert_eq!(response.status(), StatusCode::OK);
    let sent: Value = response.json().await.unwrap();
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["number"], "PRES-00001");
    assert_eq!(sent["number_is_final"], true);

    // Locked once issued.
    let response = add_line(
        &app,
        &id,
        json!({ "concept": "Extra", "quantity": "1", "unit_price": "1", "tax_rate": "21" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = change_status(&app, &id, "approved").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .post(app.url(&format!("/documents/{}/invoice", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["kind"], "invoice");
    assert_eq!(invoice["status"], "issued");
    assert_eq!(invoice["number"], "FAC-00001");
    assert_eq!(invoice["source_document_id"], id.as_str());
    assert_eq!(amount(&invoice["total"]), Decimal::new(21780, 2));

    let response = app
        .client
        .get(app.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap();
    let quote: Value = response.json().await.unwrap();
    assert_eq!(quote["status"], "invoiced");
    assert_eq!(quote["allowed_transitions"], json!([]));
}

#[tokio::test]
async fn line_updates_and_removal_over_http() {
    let app = TestApp::spawn().await;
    let quote = create_quote(&app).await;
    let id = quote["id"].as_str().unwrap().to_string();

    let line: Value = add_line(
        &app,
        &id,
        json!({ "concept": "Hours", "quantity": "10", "unit_price": "30", "tax_rate": "21" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let line_id = line["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .patch(app.url(&format!("/lines/{}", line_id)))
        .json(&json!({ "quantity": "12" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(amount(&updated["subtotal"]), Decimal::new(360, 0));
    assert_eq!(updated["concept"], "Hours");

    let response = app
        .client
        .delete(app.url(&format!("/lines/{}", line_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let document: Value = app
        .client
        .get(app.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(document["lines"], json!([]));
    assert_eq!(amount(&document["total"]), Decimal::ZERO);
}

#[tokio::test]
async fn errors_map_to_http_statuses() {
    let app = TestApp::spawn().await;
    let quote = create_quote(&app).await;
    let id = quote["id"].as_str().unwrap().to_string();

    let response = add_line(
        &app,
        &id,
        json!({ "concept": "Bad", "quantity": "0", "unit_price": "1", "tax_rate": "21" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let response = change_status(&app, &id, "approved").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .client
        .get(app.url(&format!("/documents/{}", uuid::Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .get(app.url(&format!("/documents/{}/tax-breakdown", uuid::Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let half = json!({
        "concept": "Half",
        "quantity": "1",
        "unit_price": "5000000000000000",
        "tax_rate": "0",
    });
    assert_eq!(add_line(&app, &id, half.clone()).await.status(), StatusCode::CREATED);
    let response = add_line(&app, &id, half).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let response = app
        .client
        .delete(app.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled: Value = response.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
async fn versions_and_duplicates_over_http() {
    let app = TestApp::spawn().await;
    let quote = create_quote(&app).await;
    let id = quote["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .post(app.url(&format!("/documents/{}/duplicate", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let copy: Value = response.json().await.unwrap();
    assert_eq!(copy["status"], "draft");
    assert_ne!(copy["id"], quote["id"]);

    let response = app
        .client
        .post(app.url(&format!("/documents/{}/versions", id)))
        .header("x-user-id", "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let version: Value = response.json().await.unwrap();
    assert_eq!(version["source_document_id"], id.as_str());
    assert_eq!(version["created_by"], "bob");

    let source: Value = app
        .client
        .get(app.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(source["status"], "sent");
    assert_eq!(source["number"], "PRES-00001");
    assert_eq!(app.store.document_count().await, 3);
}

mod common;

use common::{decimal, invoice_body, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn create_invoice_computes_totals_with_default_tax() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-001",
            "draft",
            "2026-10-01",
            "2026-10-31",
            "2.5",
            "10",
        ))
        .await;

    assert_eq!(decimal(&invoice["subtotal"]), dec("25"));
    assert_eq!(decimal(&invoice["tax"]), dec("2.13"));
    assert_eq!(decimal(&invoice["total"]), dec("27.13"));
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["email_sent"], false);
    assert_eq!(invoice["client"]["name"], "Acme");
    assert_eq!(invoice["line_items"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&invoice["line_items"][0]["total"]), dec("25"));
}

#[tokio::test]
async fn legacy_pending_status_is_stored_as_sent() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-002",
            "pending",
            "2026-10-01",
            "2026-10-31",
            "1",
            "100",
        ))
        .await;

    assert_eq!(invoice["status"], "sent");
}

#[tokio::test]
async fn duplicate_number_conflicts_within_an_owner_only() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let body = invoice_body(
        &client_id,
        "INV-001",
        "draft",
        "2026-10-01",
        "2026-10-31",
        "1",
        "50",
    );
    app.create_invoice(body.clone()).await;

    let response = app.post("/invoices", &body).await;
    assert_eq!(response.status(), 409);

    let other_owner = Uuid::new_v4();
    let other_client: Value = app
        .post_as(
            other_owner,
            "/clients",
            &json!({ "name": "Beta", "email": "beta@example.com" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let response = app
        .post_as(
            other_owner,
            "/invoices",
            &invoice_body(
                other_client["client_id"].as_str().unwrap(),
                "INV-001",
                "draft",
                "2026-10-01",
                "2026-10-31",
                "1",
                "50",
            ),
        )
        .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn invoice_for_unknown_client_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &Uuid::new_v4().to_string(),
                "INV-001",
                "draft",
                "2026-10-01",
                "2026-10-31",
                "1",
                "50",
            ),
        )
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn invoice_without_line_items_is_rejected() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let response = app
        .post(
            "/invoices",
            &json!({
                "number": "INV-001",
                "client_id": client_id,
                "issue_date": "2026-10-01",
                "due_date": "2026-10-31",
                "line_items": []
            }),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn malformed_amounts_and_dates_are_bad_requests() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &client_id,
                "INV-001",
                "draft",
                "2026-10-01",
                "2026-10-31",
                "two",
                "50",
            ),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &client_id,
                "INV-001",
                "draft",
                "10/01/2026",
                "2026-10-31",
                "1",
                "50",
            ),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &client_id,
                "INV-001",
                "void",
                "2026-10-01",
                "2026-10-31",
                "1",
                "50",
            ),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn update_changes_status_and_delete_removes_invoice() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-001",
            "sent",
            "2026-10-01",
            "2026-10-31",
            "1",
            "50",
        ))
        .await;
    let path = format!("/invoices/{}", invoice["invoice_id"].as_str().unwrap());

    let response = app
        .patch(&path, &json!({ "status": "paid", "notes": "Paid by wire" }))
        .await;
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["status"], "paid");
    assert_eq!(updated["notes"], "Paid by wire");

    assert_eq!(app.delete(&path).await.status(), 204);
    assert_eq!(app.get(&path).await.status(), 404);
    assert_eq!(app.delete(&path).await.status(), 404);
}

#[tokio::test]
async fn replacing_line_items_recomputes_amounts() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-001",
            "draft",
            "2026-10-01",
            "2026-10-31",
            "1",
            "50",
        ))
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .put(
            &format!("/invoices/{}/line-items", invoice_id),
            &json!({
                "line_items": [
                    { "description": "Design", "quantity": "3", "rate": "100" },
                    { "description": "Hosting", "quantity": "1", "rate": "20" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(decimal(&updated["subtotal"]), dec("320"));
    assert_eq!(decimal(&updated["tax"]), dec("27.20"));
    assert_eq!(decimal(&updated["total"]), dec("347.20"));

    let items: Vec<Value> = app
        .get(&format!("/invoices/{}/line-items", invoice_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["description"], "Design");
    assert_eq!(items[1]["description"], "Hosting");
}

#[tokio::test]
async fn invoices_are_isolated_by_owner() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-001",
            "draft",
            "2026-10-01",
            "2026-10-31",
            "1",
            "50",
        ))
        .await;
    let stranger = Uuid::new_v4();

    let response = app
        .get_as(
            stranger,
            &format!("/invoices/{}", invoice["invoice_id"].as_str().unwrap()),
        )
        .await;
    assert_eq!(response.status(), 404);

    let listed: Vec<Value> = app.get_as(stranger, "/invoices").await.json().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn document_is_printable_html() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-042",
            "sent",
            "2026-10-01",
            "2026-10-31",
            "10",
            "150",
        ))
        .await;

    let response = app
        .get(&format!(
            "/invoices/{}/document",
            invoice["invoice_id"].as_str().unwrap()
        ))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("invoice-INV-042.html"));
    let body = response.text().await.unwrap();
    assert!(body.contains("Invoice #INV-042"));
    assert!(body.contains("$1,627.50"));
}

#[tokio::test]
async fn blank_line_item_description_is_reported_by_position() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let response = app
        .post(
            "/invoices",
            &json!({
                "number": "INV-001",
                "client_id": client_id,
                "issue_date": "2026-10-01",
                "due_date": "2026-10-31",
                "line_items": [
                    { "description": "Design", "quantity": "1", "rate": "100" },
                    { "description": "  ", "quantity": "1", "rate": "20" }
                ]
            }),
        )
        .await;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["line_items[1].description"].is_array());
    assert!(body["fields"].get("line_items[0].description").is_none());
}

#[tokio::test]
async fn line_item_precision_beyond_storage_is_rejected() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &client_id,
                "INV-001",
                "draft",
                "2026-10-01",
                "2026-10-31",
                "1.00004",
                "50",
            ),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("line_items[0].quantity"));

    let response = app
        .post(
            "/invoices",
            &invoice_body(
                &client_id,
                "INV-001",
                "draft",
                "2026-10-01",
                "2026-10-31",
                "1",
                "100000000",
            ),
        )
        .await;
    assert_eq!(response.status(), 400);

    let invoices: Vec<Value> = app.get("/invoices").await.json().await.unwrap();
    assert!(invoices.is_empty());
}

#[tokio::test]
async fn invoice_of_deleted_client_cannot_be_modified() {
    let app = TestApp::spawn().await;
    let client_id = app.create_client("Acme", "billing@acme.example").await;
    let invoice = app
        .create_invoice(invoice_body(
            &client_id,
            "INV-001",
            "sent",
            "2026-10-01",
            "2026-10-31",
            "1",
            "50",
        ))
        .await;
    let path = format!("/invoices/{}", invoice["invoice_id"].as_str().unwrap());

    assert_eq!(app.delete(&format!("/clients/{}", client_id)).await.status(), 204);

    let response = app
        .put(
            &format!("{}/line-items", path),
            &json!({
                "line_items": [{ "description": "Design", "quantity": "3", "rate": "100" }]
            }),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app.patch(&path, &json!({ "status": "paid" })).await;
    assert_eq!(response.status(), 404);

    let response = app.post(&format!("{}/send", path), &json!({})).await;
    assert_eq!(response.status(), 404);
    assert!(app.dispatcher.records().is_empty());

    assert_eq!(app.get(&path).await.status(), 404);
    assert_eq!(app.delete(&path).await.status(), 204);
}

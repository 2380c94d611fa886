mod common;

use chrono::{Duration, Local};
use common::{decimal, invoice_body, TestApp};
use rust_decimal::Decimal;
use serde_json::Value;

#[tokio::test]
async fn empty_dashboard() {
    let app = TestApp::spawn().await;

    let stats: Value = app.get("/dashboard/stats").await.json().await.unwrap();

    assert_eq!(decimal(&stats["total_revenue"]), Decimal::ZERO);
    assert_eq!(stats["outstanding_count"], 0);
    assert_eq!(stats["total_clients"], 0);
    assert!(stats["revenue_growth"].is_null());
}

#[tokio::test]
async fn dashboard_aggregates_paid_and_outstanding() {
    let app = TestApp::spawn().await;
    let today = Local::now().date_naive();
    let issued = today.format("%Y-%m-%d").to_string();
    let due = (today + Duration::days(30)).format("%Y-%m-%d").to_string();

    let acme = app.create_client("Acme", "a@acme.example").await;
    app.create_client("Dormant", "d@dormant.example").await;

    // 100 + 8.50 tax
    app.create_invoice(invoice_body(&acme, "INV-1", "paid", &issued, &due, "1", "100"))
        .await;
    // 200 + 17 tax
    app.create_invoice(invoice_body(&acme, "INV-2", "sent", &issued, &due, "2", "100"))
        .await;
    app.create_invoice(invoice_body(&acme, "INV-3", "draft", &issued, &due, "1", "1000"))
        .await;

    let stats: Value = app.get("/dashboard/stats").await.json().await.unwrap();

    assert_eq!(decimal(&stats["total_revenue"]), Decimal::new(10850, 2));
    assert_eq!(decimal(&stats["outstanding"]), Decimal::new(21700, 2));
    assert_eq!(stats["outstanding_count"], 1);
    assert_eq!(decimal(&stats["this_month"]), Decimal::new(141050, 2));
    assert_eq!(stats["monthly_invoices"], 3);
    assert_eq!(stats["total_clients"], 2);
    assert_eq!(stats["active_clients"], 1);
}

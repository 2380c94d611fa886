//! Test helper module for invoice-tracker integration tests.
//!
//! Each `TestApp` runs the full HTTP stack on a random loopback port, backed by
//! its own in-memory store and a recording mail dispatcher.

#![allow(dead_code)]

use invoice_tracker::config::{BillingConfig, ReminderConfig, TrackerConfig};
use invoice_tracker::services::mailer::{NotificationDispatcher, RecordingDispatcher};
use invoice_tracker::services::{EntityStore, MemoryStore};
use invoice_tracker::startup::Application;
use invoice_tracker::middleware::OWNER_ID_HEADER;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

pub fn test_config() -> TrackerConfig {
    TrackerConfig {
        common: CoreConfig::ephemeral(),
        service_name: "invoice-tracker-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: None,
        billing: BillingConfig::default(),
        // Daily jobs stay off so a wall-clock trigger cannot race the assertions.
        reminders: ReminderConfig {
            enabled: false,
            ..ReminderConfig::default()
        },
        smtp: None,
    }
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub http_port: u16,
    pub owner_id: Uuid,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test application on a random port.
    pub async fn spawn() -> Self {
        Self::spawn_with(RecordingDispatcher::new()).await
    }

    pub async fn spawn_with(dispatcher: RecordingDispatcher) -> Self {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(dispatcher);

        let app = Application::build_with(
            test_config(),
            store.clone() as Arc<dyn EntityStore>,
            dispatcher.clone() as Arc<dyn NotificationDispatcher>,
        )
        .await
        .expect("Failed to build test application");

        let http_port = app.http_port();
        let address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            http_port,
            owner_id: Uuid::new_v4(),
            dispatcher,
            store,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    fn owned(&self, builder: RequestBuilder, owner_id: Uuid) -> RequestBuilder {
        builder.header(OWNER_ID_HEADER, owner_id.to_string())
    }

    pub async fn get(&self, path: &str) -> Response {
        self.get_as(self.owner_id, path).await
    }

    pub async fn get_as(&self, owner_id: Uuid, path: &str) -> Response {
        self.owned(self.client.get(self.url(path)), owner_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_anonymous(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.post_as(self.owner_id, path, body).await
    }

    pub async fn post_as(&self, owner_id: Uuid, path: &str, body: &Value) -> Response {
        self.owned(self.client.post(self.url(path)), owner_id)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.owned(self.client.patch(self.url(path)), self.owner_id)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.owned(self.client.put(self.url(path)), self.owner_id)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.owned(self.client.delete(self.url(path)), self.owner_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a client for the default owner and return its id.
    pub async fn create_client(&self, name: &str, email: &str) -> String {
        let response = self
            .post("/clients", &json!({ "name": name, "email": email }))
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Failed to parse client");
        body["client_id"].as_str().expect("client_id").to_string()
    }

    /// Create an invoice for the default owner and return the response body.
    pub async fn create_invoice(&self, body: Value) -> Value {
        let response = self.post("/invoices", &body).await;
        assert_eq!(response.status(), 201);
        response.json().await.expect("Failed to parse invoice")
    }
}

/// Body for a one-line invoice.
pub fn invoice_body(
    client_id: &str,
    number: &str,
    status: &str,
    issue_date: &str,
    due_date: &str,
    quantity: &str,
    rate: &str,
) -> Value {
    json!({
        "number": number,
        "client_id": client_id,
        "issue_date": issue_date,
        "due_date": due_date,
        "status": status,
        "line_items": [
            { "description": "Consulting", "quantity": quantity, "rate": rate }
        ]
    })
}

pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {}", value))
}

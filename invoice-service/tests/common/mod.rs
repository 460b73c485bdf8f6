//! Common test utilities for invoice-service integration tests.

#![allow(dead_code)]

use invoice_service::config::{DatabaseConfig, InvoiceConfig, StorageBackend};
use invoice_service::startup::Application;
use reqwest::{Client, Response};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoice_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub client: Client,
}

impl TestApp {
    /// Spawn the service on a random port over the in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(InvoiceConfig::in_memory(0)).await
    }

    /// Spawn the service over PostgreSQL, or `None` when `TEST_DATABASE_URL`
    /// is not set.
    pub async fn spawn_postgres() -> Option<Self> {
        let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

        let mut config = InvoiceConfig::in_memory(0);
        config.storage.backend = StorageBackend::Postgres;
        config.storage.database = Some(DatabaseConfig {
            url: Secret::new(database_url),
            max_connections: 2,
            min_connections: 1,
        });

        Some(Self::spawn_with(config).await)
    }

    pub async fn spawn_with(config: InvoiceConfig) -> Self {
        init_tracing();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.http_address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{}", self.http_address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{}{}", self.http_address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Import `invoices` through the inline JSON endpoint and return the result.
    pub async fn import(&self, invoices: Vec<Value>) -> Value {
        let document = json!({ "invoices": invoices }).to_string();
        let response = self
            .post("/api/data/load-from-json", &json!({ "json_content": document }))
            .await;
        assert_eq!(response.status(), 200, "import failed");
        response.json().await.expect("Failed to parse JSON")
    }

    /// Fetch one invoice by number, including inconsistent ones.
    pub async fn invoice_by_number(&self, invoice_number: i64) -> Value {
        let response = self
            .get(&format!(
                "/api/invoices?invoice_number={}&consistent_only=false",
                invoice_number
            ))
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["count"], 1, "invoice {} not found", invoice_number);
        body["data"][0].clone()
    }

    pub async fn add_credit_note(&self, invoice_id: &str, amount: &str) -> Response {
        self.post(
            "/api/credit-notes",
            &json!({ "invoice_id": invoice_id, "credit_note_amount": amount }),
        )
        .await
    }
}

/// A random positive invoice number, unique enough for a shared database.
pub fn unique_invoice_number() -> i64 {
    (uuid::Uuid::new_v4().as_u128() >> 65) as i64
}

/// Import record builder.
pub struct InvoiceFixture {
    pub invoice_number: i64,
    pub total_amount: f64,
    pub subtotals: Vec<f64>,
    pub payment_due_date: &'static str,
    pub payment_method: Option<&'static str>,
    pub credit_notes: Vec<f64>,
    pub customer_run: String,
}

impl InvoiceFixture {
    pub fn new(invoice_number: i64, total_amount: f64, subtotals: &[f64]) -> Self {
        Self {
            invoice_number,
            total_amount,
            subtotals: subtotals.to_vec(),
            payment_due_date: "2020-02-14",
            payment_method: None,
            credit_notes: Vec::new(),
            customer_run: "76.543.210-K".to_string(),
        }
    }

    pub fn due(mut self, payment_due_date: &'static str) -> Self {
        self.payment_due_date = payment_due_date;
        self
    }

    pub fn paid_with(mut self, method: &'static str) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn credit_note(mut self, amount: f64) -> Self {
        self.credit_notes.push(amount);
        self
    }

    pub fn customer(mut self, customer_run: &str) -> Self {
        self.customer_run = customer_run.to_string();
        self
    }

    pub fn to_json(&self) -> Value {
        let details: Vec<Value> = self
            .subtotals
            .iter()
            .enumerate()
            .map(|(i, subtotal)| {
                json!({
                    "product_name": format!("Product {}", i + 1),
                    "unit_price": subtotal,
                    "quantity": 1,
                    "subtotal": subtotal
                })
            })
            .collect();
        let credit_notes: Vec<Value> = self
            .credit_notes
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                json!({
                    "credit_note_number": i as i64 + 1,
                    "credit_note_date": "2020-01-20",
                    "credit_note_amount": amount
                })
            })
            .collect();

        json!({
            "invoice_number": self.invoice_number,
            "invoice_date": "2020-01-15",
            "invoice_status": "issued",
            "total_amount": self.total_amount,
            "days_to_due": 30,
            "payment_due_date": self.payment_due_date,
            "payment_status": "Pending",
            "invoice_detail": details,
            "invoice_payment": {
                "payment_method": self.payment_method,
                "payment_date": self.payment_method.map(|_| "2020-01-25")
            },
            "invoice_credit_note": credit_notes,
            "customer": {
                "customer_run": self.customer_run,
                "customer_name": format!("Customer {}", self.customer_run),
                "customer_email": "billing@example.test"
            }
        })
    }
}

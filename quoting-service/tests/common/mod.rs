//! Common test utilities for quoting-service integration tests.
#![allow(dead_code)]

use quoting_service::config::QuotingConfig;
use quoting_service::domain::NumberingAuthority;
use quoting_service::models::{Actor, CreateDocument, Document, DocumentStatus, LineInput};
use quoting_service::services::{Database, DocumentService, MemoryStore};
use quoting_service::startup::Application;
use rust_decimal::Decimal;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,quoting_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn actor() -> Actor {
    Actor::new("user-1")
}

/// Document service over a fresh in-memory store.
pub fn service() -> (DocumentService, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let service = DocumentService::new(store.clone(), NumberingAuthority::default());
    (service, store)
}

pub fn line(concept: &str, quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> LineInput {
    LineInput {
        concept: concept.to_string(),
        description: None,
        quantity,
        unit_price,
        discount_percent: None,
        tax_rate,
        line_order: None,
    }
}

pub fn discounted(mut input: LineInput, discount_percent: Decimal) -> LineInput {
    input.discount_percent = Some(discount_percent);
    input
}

pub async fn draft_quote(service: &DocumentService) -> Document {
    service
        .create_document(
            CreateDocument {
                client_reference: Some("ACME".to_string()),
                ..Default::default()
            },
            &actor(),
        )
        .await
        .expect("Failed to create draft")
}

/// Draft quote with one priced line.
pub async fn quote_with_line(service: &DocumentService, line_input: LineInput) -> Document {
    let draft = draft_quote(service).await;
    service
        .add_line(draft.id, line_input, &actor())
        .await
        .expect("Failed to add line");
    service
        .get_document(draft.id)
        .await
        .expect("Failed to reload draft")
}

/// PostgreSQL store from `TEST_DATABASE_URL`, migrated. `None` when the
/// variable is unset so the in-memory suites still run on their own.
pub async fn postgres_store() -> Option<Arc<Database>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    init_tracing();
    let db = Database::new(&url, 5, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    Some(Arc::new(db))
}

/// Drive a document through `path` with plain status changes.
pub async fn walk(service: &DocumentService, document: &Document, path: &[DocumentStatus]) -> Document {
    let mut current = document.clone();
    for status in path {
        current = service
            .change_status(current.id, *status, &actor())
            .await
            .unwrap_or_else(|e| panic!("Failed to move to {}: {}", status, e));
    }
    current
}

/// Test application bound to an ephemeral port over an in-memory store.
pub struct TestApp {
    pub http_address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let app = Application::build_with_store(QuotingConfig::for_tests(), store.clone())
            .await
            .expect("Failed to build application");

        let http_address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            http_address,
            client: reqwest::Client::new(),
            store,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_address, path)
    }
}

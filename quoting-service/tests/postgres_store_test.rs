//! PostgreSQL store tests. Skipped unless `TEST_DATABASE_URL` is set.

mod common;

use common::{actor, line, postgres_store};
use quoting_service::domain::{DocumentError, NumberingAuthority};
use quoting_service::models::CreateDocument;
use quoting_service::services::{DocumentService, DocumentStore, StoreError};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn load_lines_distinguishes_missing_from_empty_documents() {
    let Some(db) = postgres_store().await else {
        return;
    };

    let err = db.load_lines(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    let service = DocumentService::new(db.clone(), NumberingAuthority::default());
    let draft = service
        .create_document(CreateDocument::default(), &actor())
        .await
        .unwrap();
    assert!(db.load_lines(draft.id).await.unwrap().is_empty());

    let err = service.tax_breakdown(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(_)));

    service
        .add_line(draft.id, line("Setup", dec!(1), dec!(100), dec!(21)), &actor())
        .await
        .unwrap();
    let totals = service.tax_breakdown(draft.id).await.unwrap();
    assert_eq!(totals.total, dec!(121.00));
}

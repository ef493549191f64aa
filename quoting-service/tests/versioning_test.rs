//! Numbering, new versions, duplicates and quote-to-invoice conversion.

mod common;

use common::{actor, discounted, draft_quote, line, quote_with_line, service, walk};
use quoting_service::domain::DocumentError;
use quoting_service::models::{DocumentKind, DocumentNumber, DocumentStatus};
use rust_decimal_macros::dec;
use std::collections::HashSet;

#[tokio::test]
async fn repeated_issuance_never_reuses_a_number() {
    let (service, _store) = service();
    let mut seen = HashSet::new();

    for i in 1..=25 {
        let draft = draft_quote(&service).await;
        let provisional = draft.number.clone();
        let sent = walk(&service, &draft, &[DocumentStatus::Sent]).await;

        assert_ne!(sent.number, provisional);
        assert_eq!(sent.number, DocumentNumber::Final(format!("PRES-{:05}", i)));
        assert!(seen.insert(sent.number.as_str().to_string()));

        // Later status changes keep the number.
        let approved = walk(&service, &sent, &[DocumentStatus::Approved]).await;
        assert_eq!(approved.number, sent.number);
    }
}

#[tokio::test]
async fn quote_and_invoice_sequences_are_independent() {
    let (service, _store) = service();
    let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
    walk(
        &service,
        &quote,
        &[DocumentStatus::Sent, DocumentStatus::Approved],
    )
    .await;

    let invoice = service.convert_to_invoice(quote.id, &actor()).await.unwrap();
    assert_eq!(invoice.number, DocumentNumber::Final("FAC-00001".to_string()));
}

#[tokio::test]
async fn new_version_of_a_draft_issues_the_source_first() {
    let (service, store) = service();
    let source = quote_with_line(
        &service,
        discounted(line("Consulting", dec!(2), dec!(100.00), dec!(21)), dec!(10)),
    )
    .await;
    service
        .update_notes(source.id, Some("v1".to_string()), &actor())
        .await
        .unwrap();

    let draft = service.new_version(source.id, &actor()).await.unwrap();
    let source = service.get_document(source.id).await.unwrap();

    assert_eq!(source.status, DocumentStatus::Sent);
    assert_eq!(source.number, DocumentNumber::Final("PRES-00001".to_string()));

    assert_eq!(draft.status, DocumentStatus::Draft);
    assert!(!draft.number.is_final());
    assert_ne!(draft.id, source.id);
    assert_eq!(draft.source_document_id, Some(source.id));
    assert_eq!(draft.notes.as_deref(), Some("v1"));
    assert_eq!(draft.client_reference, source.client_reference);
    assert_eq!(draft.total, source.total);

    assert_eq!(draft.lines.len(), source.lines.len());
    for (copy, original) in draft.lines.iter().zip(&source.lines) {
        assert!(copy.same_content(original));
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.document_id, draft.id);
    }
    assert_eq!(store.document_count().await, 2);
    assert_eq!(store.line_count().await, 2);

    // The copy is independent of the frozen source.
    service
        .add_line(draft.id, line("Extra", dec!(1), dec!(50), dec!(21)), &actor())
        .await
        .unwrap();
    let source_after = service.get_document(source.id).await.unwrap();
    assert_eq!(source_after.lines.len(), 1);
    assert_eq!(source_after.total, dec!(217.80));
}

#[tokio::test]
async fn new_version_of_a_sent_quote_leaves_it_untouched() {
    let (service, _store) = service();
    let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
    let sent = walk(&service, &quote, &[DocumentStatus::Sent]).await;

    let draft = service.new_version(sent.id, &actor()).await.unwrap();

    assert_eq!(service.get_document(sent.id).await.unwrap(), sent);
    assert_eq!(draft.status, DocumentStatus::Draft);
    assert_eq!(draft.source_document_id, Some(sent.id));
}

#[tokio::test]
async fn duplicate_copies_without_touching_the_source() {
    let (service, _store) = service();
    let source = quote_with_line(&service, line("Work", dec!(3), dec!(12.5), dec!(10))).await;

    let copy = service.duplicate(source.id, &actor()).await.unwrap();

    assert_eq!(service.get_document(source.id).await.unwrap(), source);
    assert_eq!(copy.status, DocumentStatus::Draft);
    assert!(!copy.number.is_final());
    assert_eq!(copy.total, source.total);
    assert!(copy.lines[0].same_content(&source.lines[0]));
}

#[tokio::test]
async fn invoices_cannot_be_versioned_or_duplicated() {
    let (service, _store) = service();
    let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
    walk(
        &service,
        &quote,
        &[DocumentStatus::Sent, DocumentStatus::Approved],
    )
    .await;
    let invoice = service.convert_to_invoice(quote.id, &actor()).await.unwrap();

    assert!(matches!(
        service.new_version(invoice.id, &actor()).await,
        Err(DocumentError::IllegalTransition { .. })
    ));
    assert!(matches!(
        service.duplicate(invoice.id, &actor()).await,
        Err(DocumentError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn conversion_requires_an_approved_quote() {
    let (service, store) = service();

    for path in [
        vec![],
        vec![DocumentStatus::Sent],
        vec![DocumentStatus::Sent, DocumentStatus::Rejected],
        vec![DocumentStatus::Sent, DocumentStatus::Expired],
        vec![DocumentStatus::Cancelled],
    ] {
        let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
        let quote = walk(&service, &quote, &path).await;
        let documents_before = store.document_count().await;

        let err = service
            .convert_to_invoice(quote.id, &actor())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::IllegalTransition { .. }));
        assert_eq!(service.get_document(quote.id).await.unwrap(), quote);
        assert_eq!(store.document_count().await, documents_before);
    }

    // Refused conversions burn no invoice number.
    let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
    walk(
        &service,
        &quote,
        &[DocumentStatus::Sent, DocumentStatus::Approved],
    )
    .await;
    let invoice = service.convert_to_invoice(quote.id, &actor()).await.unwrap();
    assert_eq!(invoice.number.as_str(), "FAC-00001");
}

#[tokio::test]
async fn conversion_produces_an_issued_invoice_matching_the_quote() {
    let (service, _store) = service();
    let quote = quote_with_line(
        &service,
        discounted(line("Consulting", dec!(2), dec!(100.00), dec!(21)), dec!(10)),
    )
    .await;
    service
        .add_line(quote.id, line("Travel", dec!(1), dec!(35.55), dec!(10)), &actor())
        .await
        .unwrap();
    let approved = walk(
        &service,
        &quote,
        &[DocumentStatus::Sent, DocumentStatus::Approved],
    )
    .await;

    let invoice = service.convert_to_invoice(quote.id, &actor()).await.unwrap();
    let quote = service.get_document(quote.id).await.unwrap();

    assert_eq!(quote.status, DocumentStatus::Invoiced);
    assert_eq!(invoice.kind, DocumentKind::Invoice);
    assert_eq!(invoice.status, DocumentStatus::Issued);
    assert!(invoice.number.is_final());
    assert!(invoice.issued_at.is_some());
    assert_eq!(invoice.source_document_id, Some(quote.id));
    assert_eq!(invoice.total, approved.total);
    assert_eq!(invoice.subtotal, approved.subtotal);
    assert_eq!(invoice.tax_amount, approved.tax_amount);
    assert_eq!(invoice.lines.len(), 2);

    let err = service
        .add_line(invoice.id, line("Late", dec!(1), dec!(1), dec!(21)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::DocumentLocked { .. }));

    // Converting twice is refused.
    let err = service
        .convert_to_invoice(quote.id, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::IllegalTransition { .. }));
}

#[tokio::test]
async fn failed_commit_leaves_both_documents_untouched() {
    let (service, store) = service();
    let quote = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;
    let approved = walk(
        &service,
        &quote,
        &[DocumentStatus::Sent, DocumentStatus::Approved],
    )
    .await;
    let documents_before = store.document_count().await;

    store.fail_next_commit();
    let err = service
        .convert_to_invoice(quote.id, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::Storage(_)));
    assert_eq!(service.get_document(quote.id).await.unwrap(), approved);
    assert_eq!(store.document_count().await, documents_before);

    // The reserved number is burnt, never handed out twice.
    let invoice = service.convert_to_invoice(quote.id, &actor()).await.unwrap();
    assert_eq!(invoice.number.as_str(), "FAC-00002");
}

#[tokio::test]
async fn failed_new_version_does_not_issue_the_source() {
    let (service, store) = service();
    let source = quote_with_line(&service, line("Work", dec!(1), dec!(10), dec!(21))).await;

    store.fail_next_commit();
    let err = service.new_version(source.id, &actor()).await.unwrap_err();
    assert!(matches!(err, DocumentError::Storage(_)));

    let stored = service.get_document(source.id).await.unwrap();
    assert_eq!(stored, source);
    assert_eq!(store.document_count().await, 1);
}

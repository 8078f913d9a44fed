use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use patient_cell::{patient_routes, IdentityResolver, PatientError, PatientRecord, PatientService};
use shared_database::{MemoryTable, StoreError, Table};
use shared_utils::test_utils::{patient_table, PATIENT_HEADERS};

fn record(name: &str, dob: &str) -> PatientRecord {
    PatientRecord {
        name: name.to_string(),
        dob: dob.to_string(),
        location: Some("Chennai".to_string()),
        insurance_carrier: Some("Acme Health".to_string()),
        member_id: Some("M-1".to_string()),
        group_number: Some("G-1".to_string()),
        email: Some("new@example.com".to_string()),
        phone: Some("9876543210".to_string()),
    }
}

#[tokio::test]
async fn test_append_creates_missing_store_with_canonical_headers() {
    let store = Arc::new(MemoryTable::missing("patients"));
    let service = PatientService::new(store.clone());

    service.append(&record("Asha Nair", "14-02-1995")).await.unwrap();

    let table = store.snapshot().await.unwrap();
    assert_eq!(table.columns, PATIENT_HEADERS.map(String::from).to_vec());
    assert_eq!(table.rows[0].get("Member ID"), Some(&json!("M-1")));
}

#[tokio::test]
async fn test_append_then_lookup_is_returning() {
    let store = Arc::new(MemoryTable::with_table("patients", patient_table(&[])));
    PatientService::new(store.clone())
        .append(&record("Asha Nair", "14-02-1995"))
        .await
        .unwrap();

    let lookup = IdentityResolver::new(store, 0.87)
        .lookup(Some("asha nair"), Some("1995-02-14"))
        .await;
    assert!(lookup.is_returning());
}

#[tokio::test]
async fn test_remove_latest_only_removes_last_matching_row() {
    let store = Arc::new(MemoryTable::with_table(
        "patients",
        patient_table(&[("Asha Nair", "14-02-1995"), ("Ravi Menon", "21-07-1975")]),
    ));
    let service = PatientService::new(store.clone());
    service.append(&record("Asha Nair", "14-02-1995")).await.unwrap();

    assert!(service.remove_latest("Asha  Nair", "1995-02-14").await.unwrap());

    let table = store.snapshot().await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].get("Location"), Some(&json!("Bangalore")));
    assert!(!service.remove_latest("Nobody", "01-01-2000").await.unwrap());
}

#[tokio::test]
async fn test_append_surfaces_write_failure() {
    let store = Arc::new(MemoryTable::with_table("patients", Table::new(&PATIENT_HEADERS)));
    store.set_fail_writes(true);

    let result = PatientService::new(store).append(&record("Asha Nair", "14-02-1995")).await;

    assert_matches!(result, Err(PatientError::Store(StoreError::WriteFailed { .. })));
}

#[tokio::test]
async fn test_lookup_route_returns_classification() {
    let store = Arc::new(MemoryTable::with_table(
        "patients",
        patient_table(&[("Kishore Kumar K", "12-03-1990")]),
    ));
    let app = patient_routes(Arc::new(IdentityResolver::new(store, 0.87)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/lookup?name=Kishore%20Kumar&dob=12-03-1990")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "returning");
    assert_eq!(value["match_kind"], "fuzzy");
}

use std::sync::Arc;

use assert_matches::assert_matches;

use appointment_cell::{
    BookingFinalizer, BookingStatus, BookingTransaction, ContactDetails, FinalizeOutcome,
    IntakeFormService, IntakeFormStatus, LedgerService,
};
use doctor_cell::{AllocationRequest, Reservation, SlotAllocator};
use notification_cell::{NotificationKind, NotificationProducer, OutboxQueue};
use patient_cell::{InsuranceDetails, MatchedPatient, PatientService};
use shared_database::{MemoryTable, Table};
use shared_models::PatientClassification;
use shared_utils::test_utils::{open_day, patient_table, TestConfig};

struct Harness {
    patients: Arc<MemoryTable>,
    schedule: Arc<MemoryTable>,
    ledger: Arc<MemoryTable>,
    queue: Arc<OutboxQueue>,
    allocator: Arc<SlotAllocator>,
    producer: Arc<NotificationProducer>,
    finalizer: BookingFinalizer,
}

fn harness() -> Harness {
    let patients = Arc::new(MemoryTable::with_table(
        "patients",
        patient_table(&[("Kishore Kumar", "12-03-1990")]),
    ));
    let schedule = Arc::new(MemoryTable::with_table(
        "schedule",
        open_day("Dr. Meena Iyer", "08-09-2025"),
    ));
    let ledger = Arc::new(MemoryTable::missing("ledger"));
    let queue = Arc::new(OutboxQueue::new());
    let allocator = Arc::new(SlotAllocator::new(schedule.clone()));
    let producer = Arc::new(NotificationProducer::new(queue.clone(), "+91"));
    let finalizer = BookingFinalizer::new(
        Arc::new(PatientService::new(patients.clone())),
        allocator.clone(),
        Arc::new(LedgerService::new(ledger.clone())),
        producer.clone(),
    );
    Harness {
        patients,
        schedule,
        ledger,
        queue,
        allocator,
        producer,
        finalizer,
    }
}

async fn reserve(h: &Harness, name: &str, classification: PatientClassification) -> Reservation {
    h.allocator
        .allocate(&AllocationRequest {
            provider: "Dr. Meena Iyer".to_string(),
            date: "08-09-2025".to_string(),
            patient_name: name.to_string(),
            classification,
            location: Some("Chennai".to_string()),
        })
        .await
        .reservation()
        .cloned()
        .expect("slot should be reserved")
}

fn contact() -> ContactDetails {
    ContactDetails {
        email: Some("anita@example.com".to_string()),
        phone: Some("9876543210".to_string()),
    }
}

async fn new_patient_txn(h: &Harness) -> BookingTransaction {
    BookingTransaction {
        classification: PatientClassification::New,
        name: Some("Anita Rao".to_string()),
        dob: Some("05-07-1988".to_string()),
        location: Some("Chennai".to_string()),
        insurance: InsuranceDetails {
            carrier: Some("Star Health".to_string()),
            member_id: Some("SH-42".to_string()),
            group_number: Some("G-9".to_string()),
        },
        matched: None,
        contact: contact(),
        reservation: Some(reserve(h, "Anita Rao", PatientClassification::New).await),
        patient_staged: false,
    }
}

fn patient_names(table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|row| row["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn booked_count(table: &Table) -> usize {
    table
        .rows
        .iter()
        .filter(|row| row["Status"].as_str() != Some("Available"))
        .count()
}

#[tokio::test]
async fn test_confirm_new_patient_writes_patient_and_ledger() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;

    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;

    assert_eq!(outcome.status_code(), "appointment_confirmed");
    assert!(txn.patient_staged);
    let patients = h.patients.snapshot().await.unwrap();
    assert_eq!(patient_names(&patients), vec!["Kishore Kumar", "Anita Rao"]);

    let ledger = h.ledger.snapshot().await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.rows[0]["Time_Slot"], "10:00-10:30 & 10:30-11:00");
    assert_eq!(ledger.rows[0]["Status"], "Confirmed");
    assert_eq!(ledger.rows[0]["Form_Filled"], "No");

    let jobs = h.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, NotificationKind::BookingConfirmed);
    assert_eq!(jobs[0].recipient, "+919876543210");
}

#[tokio::test]
async fn test_confirm_returning_patient_uses_stored_record() {
    let h = harness();
    let mut txn = BookingTransaction {
        classification: PatientClassification::Returning,
        name: Some("kishore kumar k".to_string()),
        dob: Some("12-03-1990".to_string()),
        matched: Some(MatchedPatient {
            name: "Kishore Kumar".to_string(),
            dob: "12-03-1990".to_string(),
            location: Some("Bangalore".to_string()),
            insurance_carrier: Some("Star Health".to_string()),
            member_id: Some("MEM-1001".to_string()),
            group: Some("GRP-77".to_string()),
        }),
        contact: contact(),
        reservation: Some(reserve(&h, "Kishore Kumar", PatientClassification::Returning).await),
        ..Default::default()
    };

    let outcome = h.finalizer.finalize(&mut txn, "confirm ").await;

    assert_matches!(outcome, FinalizeOutcome::Confirmed { ref booking, .. } => {
        assert_eq!(booking.patient_name, "Kishore Kumar");
        assert_eq!(booking.time_slot, "10:00-10:30");
        assert_eq!(booking.status, BookingStatus::Confirmed);
    });
    assert!(!txn.patient_staged);
    let patients = h.patients.snapshot().await.unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(h.patients.save_count(), 0);
}

#[tokio::test]
async fn test_cancel_releases_slots_without_touching_ledger() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;
    assert_eq!(booked_count(&h.schedule.snapshot().await.unwrap()), 2);

    let outcome = h.finalizer.finalize(&mut txn, "CANCEL").await;

    assert_matches!(
        outcome,
        FinalizeOutcome::Cancelled { released_slots: 2, patient_removed: false }
    );
    assert_eq!(booked_count(&h.schedule.snapshot().await.unwrap()), 0);
    assert!(h.ledger.snapshot().await.is_none());
    assert_eq!(h.patients.snapshot().await.unwrap().len(), 1);

    let jobs = h.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, NotificationKind::BookingCancelled);
}

#[tokio::test]
async fn test_ledger_failure_keeps_staged_record_and_retry_does_not_duplicate() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;
    h.ledger.set_fail_writes(true);

    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;

    assert_eq!(outcome.status_code(), "error_writing_ledger");
    assert!(!outcome.is_final());
    assert!(txn.patient_staged);
    assert!(h.queue.jobs().await.is_empty());

    h.ledger.set_fail_writes(false);
    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;

    assert!(outcome.is_confirmed());
    let patients = h.patients.snapshot().await.unwrap();
    assert_eq!(patient_names(&patients), vec!["Kishore Kumar", "Anita Rao"]);
}

#[tokio::test]
async fn test_cancel_after_failed_confirm_removes_staged_patient() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;
    h.ledger.set_fail_writes(true);
    h.finalizer.finalize(&mut txn, "CONFIRM").await;

    let outcome = h.finalizer.finalize(&mut txn, "cancel").await;

    assert_matches!(outcome, FinalizeOutcome::Cancelled { patient_removed: true, .. });
    assert!(!txn.patient_staged);
    let patients = h.patients.snapshot().await.unwrap();
    assert_eq!(patient_names(&patients), vec!["Kishore Kumar"]);
}

#[tokio::test]
async fn test_patient_write_failure_is_reported() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;
    h.patients.set_fail_writes(true);

    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;

    assert_eq!(outcome.status_code(), "error_writing_patient_db");
    assert!(!txn.patient_staged);
    assert!(h.ledger.snapshot().await.is_none());
}

#[tokio::test]
async fn test_schedule_failure_on_cancel_is_reported() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;
    h.schedule.set_fail_writes(true);

    let outcome = h.finalizer.finalize(&mut txn, "CANCEL").await;

    assert_eq!(outcome.status_code(), "error_writing_schedule");
    assert!(h.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn test_without_reservation_finalize_is_skipped() {
    let h = harness();
    let mut txn = BookingTransaction::default();

    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;

    assert_eq!(outcome, FinalizeOutcome::SkippedNoBooking);
    assert_eq!(outcome.status_code(), "skipped_no_booking");
    assert!(h.ledger.snapshot().await.is_none());
}

#[tokio::test]
async fn test_unrecognised_decision_changes_nothing() {
    let h = harness();
    let mut txn = new_patient_txn(&h).await;

    let outcome = h.finalizer.finalize(&mut txn, "maybe").await;

    assert_eq!(outcome, FinalizeOutcome::InvalidDecision);
    assert_eq!(h.patients.save_count(), 0);
    assert_eq!(booked_count(&h.schedule.snapshot().await.unwrap()), 2);
}

#[tokio::test]
async fn test_intake_form_queued_for_confirmed_booking() {
    let h = harness();
    let test_config = TestConfig::new();
    let form_path = test_config.config.intake_form_path.clone();
    tokio::fs::write(&form_path, b"%PDF-1.4").await.unwrap();
    let intake = IntakeFormService::new(h.producer.clone(), form_path.clone());
    let mut txn = new_patient_txn(&h).await;

    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;
    let status = intake.send(&outcome).await;

    assert_eq!(status, IntakeFormStatus::Queued);
    let jobs = h.queue.jobs().await;
    let form_job = jobs
        .iter()
        .find(|job| job.kind == NotificationKind::IntakeForm)
        .unwrap();
    assert_eq!(form_job.recipient, "anita@example.com");
    assert_eq!(form_job.attachment.as_ref(), Some(&form_path));
}

#[tokio::test]
async fn test_intake_form_statuses_without_send() {
    let h = harness();
    let test_config = TestConfig::new();
    let intake = IntakeFormService::new(h.producer.clone(), test_config.config.intake_form_path.clone());

    let skipped = intake.send(&FinalizeOutcome::InvalidDecision).await;
    assert_eq!(skipped.status_code(), "skipped_not_confirmed");

    let mut txn = new_patient_txn(&h).await;
    txn.contact.email = Some("  ".to_string());
    let outcome = h.finalizer.finalize(&mut txn, "CONFIRM").await;
    assert_eq!(intake.send(&outcome).await, IntakeFormStatus::ErrorNoEmailFound);

    let h2 = harness();
    let mut txn = new_patient_txn(&h2).await;
    let outcome = h2.finalizer.finalize(&mut txn, "CONFIRM").await;
    let status = intake.send(&outcome).await;
    assert_matches!(status, IntakeFormStatus::ErrorFormNotFound(_));
    assert!(status.status_code().starts_with("error_form_not_found_at_"));
}

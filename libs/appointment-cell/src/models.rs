use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use doctor_cell::{Reservation, ScheduleError};
use patient_cell::{InsuranceDetails, MatchedPatient, PatientError, PatientRecord};
use shared_database::{ColumnSpec, StoreError, TableSchema};
use shared_models::PatientClassification;

const LEDGER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("patient_name", &["Patient_Name", "patient name"]),
    ColumnSpec::optional("patient_dob", &["Patient_DOB", "dob"]),
    ColumnSpec::required("doctor", &["Doctor_Name", "doctor"]),
    ColumnSpec::required("date", &["DOA", "appointment_date", "date"]),
    ColumnSpec::required("time", &["Time_Slot", "time"]),
    ColumnSpec::optional("email", &["Email"]),
    ColumnSpec::optional("phone", &["Phone_Number", "phone"]),
    ColumnSpec::required("status", &["Status"]),
    ColumnSpec::optional("form_filled", &["Form_Filled"]),
    ColumnSpec::optional("cancellation_reason", &["Cancellation_Reason"]),
];

pub const LEDGER_SCHEMA: TableSchema = TableSchema::new("booking ledger", LEDGER_COLUMNS);

const REMINDER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("patient_name", &["Patient_Name", "patient name"]),
    ColumnSpec::required("doctor", &["Doctor_Name", "doctor"]),
    ColumnSpec::required("date", &["DOA", "appointment_date", "date"]),
    ColumnSpec::required("time", &["Time_Slot", "time"]),
    ColumnSpec::required("status", &["Status"]),
    ColumnSpec::optional("phone", &["Phone_Number", "phone"]),
    ColumnSpec::optional("reminder1", &["Reminder1_Sent"]),
    ColumnSpec::optional("reminder2", &["Reminder2_Sent"]),
    ColumnSpec::optional("reminder3", &["Reminder3_Sent"]),
];

/// Ledger view used by the reminder sweep; the tracking columns are added on first use.
pub const REMINDER_SCHEMA: TableSchema = TableSchema::new("booking ledger", REMINDER_COLUMNS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "Confirmed"),
            BookingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A ledger row, serialized with the ledger's canonical headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(rename = "Patient_Name")]
    pub patient_name: String,
    #[serde(rename = "Patient_DOB")]
    pub patient_dob: String,
    #[serde(rename = "Doctor_Name")]
    pub doctor_name: String,
    #[serde(rename = "DOA")]
    pub doa: String,
    #[serde(rename = "Time_Slot")]
    pub time_slot: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone_Number")]
    pub phone_number: String,
    #[serde(rename = "Status")]
    pub status: BookingStatus,
    #[serde(rename = "Form_Filled")]
    pub form_filled: String,
    #[serde(rename = "Cancellation_Reason")]
    pub cancellation_reason: String,
}

impl BookingRecord {
    pub fn confirmed(patient: &PatientRecord, reservation: &Reservation) -> Self {
        Self {
            patient_name: patient.name.clone(),
            patient_dob: patient.dob.clone(),
            doctor_name: reservation.provider.clone(),
            doa: reservation.date.clone(),
            time_slot: reservation.time_label(),
            email: patient.email.clone().unwrap_or_default(),
            phone_number: patient.phone.clone().unwrap_or_default(),
            status: BookingStatus::Confirmed,
            form_filled: "No".to_string(),
            cancellation_reason: String::new(),
        }
    }
}

/// The patient's answer at the end of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Confirm,
    Cancel,
}

impl Decision {
    /// Accepts `CONFIRM` or `CANCEL` in any case, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CONFIRM" => Some(Decision::Confirm),
            "CANCEL" => Some(Decision::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Everything the finalizer needs from a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingTransaction {
    pub classification: PatientClassification,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub location: Option<String>,
    pub insurance: InsuranceDetails,
    pub matched: Option<MatchedPatient>,
    pub contact: ContactDetails,
    pub reservation: Option<Reservation>,
    /// Set once a new patient's record has been appended to the patient store.
    pub patient_staged: bool,
}

impl BookingTransaction {
    /// The record this booking is made under. Returning patients get their stored
    /// details with the contact entered for this booking.
    pub fn patient_record(&self) -> PatientRecord {
        let email = self.contact.email.clone().unwrap_or_default();
        let phone = self.contact.phone.clone().unwrap_or_default();

        if let (true, Some(matched)) = (self.classification.is_returning(), &self.matched) {
            return PatientRecord::for_returning(matched, &email, &phone);
        }

        PatientRecord {
            name: self.name.clone().unwrap_or_default(),
            dob: self.dob.clone().unwrap_or_default(),
            location: self.location.clone(),
            insurance_carrier: self.insurance.carrier.clone(),
            member_id: self.insurance.member_id.clone(),
            group_number: self.insurance.group_number.clone(),
            email: Some(email),
            phone: Some(phone),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Confirmed {
        booking: BookingRecord,
        patient: PatientRecord,
    },
    Cancelled {
        released_slots: usize,
        patient_removed: bool,
    },
    SkippedNoBooking,
    InvalidDecision,
    WriteFailed {
        store: &'static str,
        message: String,
    },
}

impl FinalizeOutcome {
    pub fn status_code(&self) -> String {
        match self {
            FinalizeOutcome::Confirmed { .. } => "appointment_confirmed".to_string(),
            FinalizeOutcome::Cancelled { .. } => "appointment_cancelled".to_string(),
            FinalizeOutcome::SkippedNoBooking => "skipped_no_booking".to_string(),
            FinalizeOutcome::InvalidDecision => "invalid_decision".to_string(),
            FinalizeOutcome::WriteFailed { store, .. } => format!("error_writing_{}", store),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, FinalizeOutcome::Confirmed { .. })
    }

    /// Confirmed and cancelled bookings end the conversation; everything else
    /// leaves the decision open.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            FinalizeOutcome::Confirmed { .. } | FinalizeOutcome::Cancelled { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeFormStatus {
    SkippedNotConfirmed,
    ErrorNoEmailFound,
    ErrorFormNotFound(PathBuf),
    ErrorQueueUnavailable,
    Queued,
}

impl IntakeFormStatus {
    pub fn status_code(&self) -> String {
        match self {
            IntakeFormStatus::SkippedNotConfirmed => "skipped_not_confirmed".to_string(),
            IntakeFormStatus::ErrorNoEmailFound => "error_no_email_found".to_string(),
            IntakeFormStatus::ErrorFormNotFound(path) => {
                format!("error_form_not_found_at_{}", path.display())
            }
            IntakeFormStatus::ErrorQueueUnavailable => "error_queue_unavailable".to_string(),
            IntakeFormStatus::Queued => "queued".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub rows_checked: usize,
    pub first_reminders: usize,
    pub second_reminders: usize,
    pub third_reminders: usize,
    pub ledger_updated: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Ledger error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

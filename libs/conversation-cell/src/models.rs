use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::BookingTransaction;
use doctor_cell::Reservation;
use patient_cell::PatientLookup;
use shared_models::PatientClassification;
use shared_utils::{format_dmy, parse_flexible_date};

/// Where a conversation currently is. Each stage consumes exactly one user turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Greeting,
    CollectingInfo,
    CollectingInsuranceCarrier,
    CollectingInsuranceMemberId,
    CollectingInsuranceGroupNumber,
    CollectingDate,
    CollectingEmail,
    CollectingPhone,
    CollectingDecision,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Greeting => "GREETING",
            Stage::CollectingInfo => "COLLECTING_INFO",
            Stage::CollectingInsuranceCarrier => "COLLECTING_INSURANCE_CARRIER",
            Stage::CollectingInsuranceMemberId => "COLLECTING_INSURANCE_MEMBER_ID",
            Stage::CollectingInsuranceGroupNumber => "COLLECTING_INSURANCE_GROUP_NUMBER",
            Stage::CollectingDate => "COLLECTING_DATE",
            Stage::CollectingEmail => "COLLECTING_EMAIL",
            Stage::CollectingPhone => "COLLECTING_PHONE",
            Stage::CollectingDecision => "COLLECTING_DECISION",
            Stage::Done => "DONE",
        }
    }

    /// Index into [`PROGRESS_STEPS`] shown while in this stage.
    pub fn progress_step(&self) -> usize {
        match self {
            Stage::Greeting | Stage::CollectingInfo => 0,
            Stage::CollectingDate => 2,
            Stage::CollectingInsuranceCarrier
            | Stage::CollectingInsuranceMemberId
            | Stage::CollectingInsuranceGroupNumber => 3,
            Stage::CollectingEmail | Stage::CollectingPhone | Stage::CollectingDecision => 4,
            Stage::Done => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const PROGRESS_STEPS: [&str; 6] = [
    "Patient Info",
    "Patient Lookup",
    "Scheduling",
    "Insurance",
    "Confirmation",
    "Send Confirmation",
];

/// Best-effort fields pulled out of one free-text reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub doctor: Option<String>,
    pub location: Option<String>,
}

impl ExtractedInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none() && self.doctor.is_none() && self.location.is_none()
    }
}

/// Free-text fields gathered during `COLLECTING_INFO`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedInfo {
    pub name: Option<String>,
    /// Always `DD-MM-YYYY` once set.
    pub dob: Option<String>,
    pub doctor: Option<String>,
    pub location: Option<String>,
}

/// Placeholder answers an extractor may hand back for "not mentioned".
fn clean(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    match trimmed.to_lowercase().as_str() {
        "" | "null" | "none" => None,
        _ => Some(trimmed.to_string()),
    }
}

impl CollectedInfo {
    /// Overlays newly extracted values. Returns `false` when a date of birth was
    /// given but could not be read.
    pub fn merge(&mut self, extracted: ExtractedInfo) -> bool {
        if let Some(name) = clean(extracted.name) {
            self.name = Some(name);
        }
        if let Some(doctor) = clean(extracted.doctor) {
            self.doctor = Some(doctor);
        }
        if let Some(location) = clean(extracted.location) {
            self.location = Some(location);
        }

        match clean(extracted.dob) {
            Some(raw) => match parse_flexible_date(&raw) {
                Some(date) => {
                    self.dob = Some(format_dmy(date));
                    true
                }
                None => false,
            },
            None => true,
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("full name");
        }
        if self.dob.is_none() {
            missing.push("date of birth (DD-MM-YYYY)");
        }
        if self.doctor.is_none() {
            missing.push("preferred doctor");
        }
        missing
    }
}

/// One conversation. Owned by the orchestrator for the length of a turn.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub stage: Stage,
    pub info: CollectedInfo,
    pub lookup: Option<PatientLookup>,
    pub booking: BookingTransaction,
    /// Status code of the most recent allocation or finalize attempt.
    pub last_status: Option<String>,
    pub intake_form_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Greeting,
            info: CollectedInfo::default(),
            lookup: None,
            booking: BookingTransaction::default(),
            last_status: None,
            intake_form_status: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Clears everything collected so far and returns to `GREETING`.
    pub fn reset(&mut self) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Self::new();
        self.id = id;
        self.created_at = created_at;
    }

    /// A slot is held but the patient has not confirmed or cancelled yet.
    pub fn has_pending_booking(&self) -> bool {
        self.booking.reservation.is_some() && self.stage != Stage::Done
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn classification(&self) -> PatientClassification {
        self.booking.classification
    }

    pub fn progress(&self) -> SessionProgress {
        let step_index = self.stage.progress_step();
        SessionProgress {
            session_id: self.id,
            stage: self.stage,
            step_index,
            step: PROGRESS_STEPS[step_index].to_string(),
            steps: PROGRESS_STEPS.iter().map(|step| step.to_string()).collect(),
            patient_name: self.info.name.clone(),
            dob: self.info.dob.clone(),
            doctor: self.info.doctor.clone(),
            classification: self.classification(),
            confirmed_slot: self.booking.reservation.clone(),
            completed: self.stage == Stage::Done,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only projection of a session for progress displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: Uuid,
    pub stage: Stage,
    pub step_index: usize,
    pub step: String,
    pub steps: Vec<String>,
    pub patient_name: Option<String>,
    pub dob: Option<String>,
    pub doctor: Option<String>,
    pub classification: PatientClassification,
    pub confirmed_slot: Option<Reservation>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub session_id: Uuid,
    pub stage: Stage,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Could not release the pending booking: {0}")]
    Rollback(String),
}

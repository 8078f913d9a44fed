use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use shared_database::{ColumnSpec, StoreError, TableSchema};
use shared_models::PatientClassification;

const SCHEDULE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("doctor", &["Doctor Name", "doctor", "dr", "provider"]),
    ColumnSpec::required("date", &["Date", "appointment_date"]),
    ColumnSpec::required("time", &["Time Slot", "time", "slot"]),
    ColumnSpec::required("status", &["Status", "availability"]),
];

pub const SCHEDULE_SCHEMA: TableSchema = TableSchema::new("doctor schedule", SCHEDULE_COLUMNS);

/// Availability of one schedule row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    BookedBy(String),
    /// Any other label found in the store (e.g. `Leave`); never bookable.
    Unavailable(String),
}

impl SlotStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("available") {
            return SlotStatus::Available;
        }
        const BOOKED: &str = "booked by";
        match (trimmed.get(..BOOKED.len()), trimmed.get(BOOKED.len()..)) {
            (Some(prefix), Some(name)) if prefix.eq_ignore_ascii_case(BOOKED) => {
                SlotStatus::BookedBy(name.trim().to_string())
            }
            _ => SlotStatus::Unavailable(trimmed.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SlotStatus::Available)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "Available"),
            SlotStatus::BookedBy(name) => write!(f, "Booked by {}", name),
            SlotStatus::Unavailable(label) => write!(f, "{}", label),
        }
    }
}

impl Serialize for SlotStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time-of-day block a slot belongs to. Only slots of the same block may be paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySession {
    Morning,
    Afternoon,
}

impl DaySession {
    /// Classifies a label such as `10:30-11:00` or `2:00 PM - 2:30 PM` by its start hour.
    pub fn of_label(label: &str) -> Option<Self> {
        let digits: String = label
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        match digits.parse::<u32>().ok()? {
            10 | 11 => Some(DaySession::Morning),
            2..=5 | 14..=17 => Some(DaySession::Afternoon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSlot {
    pub provider: String,
    pub date: String,
    pub time: String,
    pub status: SlotStatus,
    pub session: Option<DaySession>,
}

/// Slots held for one booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub provider: String,
    pub date: String,
    pub times: Vec<String>,
    pub location: Option<String>,
}

impl Reservation {
    pub fn time_label(&self) -> String {
        self.times.join(" & ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome {
    Confirmed(Reservation),
    Unavailable { message: String },
    Error { message: String },
}

impl SlotOutcome {
    pub fn status_code(&self) -> &'static str {
        match self {
            SlotOutcome::Confirmed(_) => "confirmed",
            SlotOutcome::Unavailable { .. } => "unavailable",
            SlotOutcome::Error { .. } => "error",
        }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            SlotOutcome::Confirmed(reservation) => Some(reservation),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SlotOutcome::Confirmed(_) => None,
            SlotOutcome::Unavailable { message } | SlotOutcome::Error { message } => Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub provider: String,
    pub date: String,
    pub patient_name: String,
    pub classification: PatientClassification,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid date format: {0}. Please use DD-MM-YYYY")]
    InvalidDate(String),

    #[error("{provider} not available on {date}")]
    NotScheduled { provider: String, date: String },

    #[error("Schedule store error: {0}")]
    Store(#[from] StoreError),
}

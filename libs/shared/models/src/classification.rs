use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of identity resolution for the person in a booking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientClassification {
    New,
    Returning,
    #[default]
    Unknown,
}

impl PatientClassification {
    pub fn is_new(&self) -> bool {
        matches!(self, PatientClassification::New)
    }

    pub fn is_returning(&self) -> bool {
        matches!(self, PatientClassification::Returning)
    }
}

impl fmt::Display for PatientClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientClassification::New => write!(f, "new"),
            PatientClassification::Returning => write!(f, "returning"),
            PatientClassification::Unknown => write!(f, "unknown"),
        }
    }
}

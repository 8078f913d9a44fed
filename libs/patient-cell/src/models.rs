use serde::{Deserialize, Serialize};
use shared_database::{ColumnSpec, StoreError, TableSchema};
use shared_models::PatientClassification;

const PATIENT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("name", &["Name", "patient_name", "full_name"]),
    ColumnSpec::required("dob", &["DOB", "date_of_birth", "birthdate"]),
    ColumnSpec::optional("location", &["Location", "city"]),
    ColumnSpec::optional("insurance_carrier", &["Insurance Carrier", "carrier", "insurance"]),
    ColumnSpec::optional("member_id", &["Member ID", "memberid", "policy_number", "policy_no"]),
    ColumnSpec::optional("group", &["Group Number", "group", "group_id"]),
    ColumnSpec::optional("email", &["Email", "email_address"]),
    ColumnSpec::optional("phone", &["Phone", "phone_number", "mobile"]),
];

/// Header aliases of the patient store.
pub const PATIENT_SCHEMA: TableSchema = TableSchema::new("patient store", PATIENT_COLUMNS);

/// A row of the patient store. Serialized with the store's canonical headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DOB")]
    pub dob: String,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Insurance Carrier")]
    pub insurance_carrier: Option<String>,
    #[serde(rename = "Member ID")]
    pub member_id: Option<String>,
    #[serde(rename = "Group Number")]
    pub group_number: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Phone")]
    pub phone: Option<String>,
}

impl PatientRecord {
    /// Transaction-scoped record for a returning patient: store details plus the
    /// contact entered for this booking. The permanent row is left untouched.
    pub fn for_returning(matched: &MatchedPatient, email: &str, phone: &str) -> Self {
        Self {
            name: matched.name.clone(),
            dob: matched.dob.clone(),
            location: matched.location.clone(),
            insurance_carrier: matched.insurance_carrier.clone(),
            member_id: matched.member_id.clone(),
            group_number: matched.group.clone(),
            email: Some(email.trim().to_string()),
            phone: Some(phone.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsuranceDetails {
    pub carrier: Option<String>,
    pub member_id: Option<String>,
    pub group_number: Option<String>,
}

/// The store row an identity resolved to, with the DOB rendered `DD-MM-YYYY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPatient {
    pub name: String,
    pub dob: String,
    pub location: Option<String>,
    pub insurance_carrier: Option<String>,
    pub member_id: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientLookup {
    pub status: PatientClassification,
    pub reason: String,
    pub match_kind: Option<MatchKind>,
    pub match_score: Option<f64>,
    pub patient: Option<MatchedPatient>,
    pub duplicates: usize,
}

impl PatientLookup {
    pub fn new_patient(reason: impl Into<String>) -> Self {
        Self {
            status: PatientClassification::New,
            reason: reason.into(),
            match_kind: None,
            match_score: None,
            patient: None,
            duplicates: 0,
        }
    }

    pub fn returning(
        patient: MatchedPatient,
        match_kind: MatchKind,
        match_score: f64,
        duplicates: usize,
    ) -> Self {
        let reason = match match_kind {
            MatchKind::Exact => "Exact name+dob match.",
            MatchKind::Fuzzy => "Fuzzy name match with exact dob.",
        };
        Self {
            status: PatientClassification::Returning,
            reason: reason.to_string(),
            match_kind: Some(match_kind),
            match_score: Some(match_score),
            patient: Some(patient),
            duplicates,
        }
    }

    pub fn is_returning(&self) -> bool {
        self.status.is_returning()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientLookupQuery {
    pub name: Option<String>,
    pub dob: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Patient store error: {0}")]
    Store(#[from] StoreError),
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_database::{Row, StoreError, TableStore};
use shared_utils::parse_flexible_date;

use crate::models::{PatientError, PatientRecord, PATIENT_SCHEMA};
use crate::services::identity::normalize_name;

/// Writes against the patient store.
pub struct PatientService {
    store: Arc<dyn TableStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Appends `record`, creating the store with the canonical headers if needed.
    pub async fn append(&self, record: &PatientRecord) -> Result<(), PatientError> {
        if normalize_name(&record.name).is_empty() {
            return Err(PatientError::ValidationError("patient name is empty".to_string()));
        }

        let mut table = self
            .store
            .load_or_create(&PATIENT_SCHEMA.default_headers())
            .await?;
        let columns = PATIENT_SCHEMA
            .resolve_for_write(&mut table)
            .map_err(StoreError::from)?;

        let mut row = Row::new();
        for header in &table.columns {
            row.insert(header.clone(), "".into());
        }
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        columns.set(&mut row, "name", record.name.trim());
        columns.set(&mut row, "dob", record.dob.trim());
        columns.set(&mut row, "location", optional(&record.location));
        columns.set(&mut row, "insurance_carrier", optional(&record.insurance_carrier));
        columns.set(&mut row, "member_id", optional(&record.member_id));
        columns.set(&mut row, "group", optional(&record.group_number));
        columns.set(&mut row, "email", optional(&record.email));
        columns.set(&mut row, "phone", optional(&record.phone));

        table.push_row(row);
        self.store.save(&table).await?;

        info!("Added patient record to {}", self.store.name());
        Ok(())
    }

    /// Removes the most recently appended row matching `(name, dob)`. Returns whether
    /// a row was removed.
    pub async fn remove_latest(&self, name: &str, dob: &str) -> Result<bool, PatientError> {
        let mut table = match self.store.load().await {
            Ok(table) => table,
            Err(e) if e.is_missing() => {
                warn!("No patient store to remove {} from", name);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let columns = PATIENT_SCHEMA
            .resolve(&table.columns)
            .map_err(StoreError::from)?;

        let target_name = normalize_name(name);
        let target_dob = parse_flexible_date(dob);

        let position = table.rows.iter().rposition(|row| {
            let same_name = columns
                .text(row, "name")
                .map(|stored| normalize_name(&stored) == target_name)
                .unwrap_or(false);
            let same_dob = match (target_dob, columns.text(row, "dob")) {
                (Some(expected), Some(stored)) => parse_flexible_date(&stored) == Some(expected),
                (None, Some(stored)) => stored == dob.trim(),
                (_, None) => false,
            };
            same_name && same_dob
        });

        let Some(index) = position else {
            debug!("No patient row matched for removal");
            return Ok(false);
        };

        table.rows.remove(index);
        self.store.save(&table).await?;
        info!("Removed staged patient record from {}", self.store.name());
        Ok(true)
    }
}

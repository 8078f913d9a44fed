use std::sync::Arc;

use tracing::{debug, info};

use shared_database::{Row, StoreError, TableStore};

use crate::models::{AppointmentError, BookingRecord, BookingStatus, LEDGER_SCHEMA};

/// Append-only access to the booking ledger.
pub struct LedgerService {
    store: Arc<dyn TableStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub async fn append(&self, record: &BookingRecord) -> Result<(), AppointmentError> {
        let mut table = self
            .store
            .load_or_create(&LEDGER_SCHEMA.default_headers())
            .await?;
        let columns = LEDGER_SCHEMA
            .resolve_for_write(&mut table)
            .map_err(StoreError::from)?;

        let mut row = Row::new();
        for header in &table.columns {
            row.insert(header.clone(), "".into());
        }
        columns.set(&mut row, "patient_name", record.patient_name.as_str());
        columns.set(&mut row, "patient_dob", record.patient_dob.as_str());
        columns.set(&mut row, "doctor", record.doctor_name.as_str());
        columns.set(&mut row, "date", record.doa.as_str());
        columns.set(&mut row, "time", record.time_slot.as_str());
        columns.set(&mut row, "email", record.email.as_str());
        columns.set(&mut row, "phone", record.phone_number.as_str());
        columns.set(&mut row, "status", record.status.to_string());
        columns.set(&mut row, "form_filled", record.form_filled.as_str());
        columns.set(&mut row, "cancellation_reason", record.cancellation_reason.as_str());

        table.push_row(row);
        self.store.save(&table).await?;

        info!(
            "Ledger entry added for {} with {} on {}",
            record.patient_name, record.doctor_name, record.doa
        );
        Ok(())
    }

    /// Ledger rows that carry a recognised status. An absent ledger reads as empty.
    pub async fn entries(&self) -> Result<Vec<BookingRecord>, AppointmentError> {
        let table = match self.store.load().await {
            Ok(table) => table,
            Err(e) if e.is_missing() => {
                debug!("No ledger yet at {}", self.store.name());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let columns = LEDGER_SCHEMA
            .resolve(&table.columns)
            .map_err(StoreError::from)?;

        let text = |row: &Row, key: &str| columns.text(row, key).unwrap_or_default();
        Ok(table
            .rows
            .iter()
            .filter_map(|row| {
                let status = match text(row, "status").as_str() {
                    "Confirmed" => BookingStatus::Confirmed,
                    "Cancelled" => BookingStatus::Cancelled,
                    _ => return None,
                };
                Some(BookingRecord {
                    patient_name: text(row, "patient_name"),
                    patient_dob: text(row, "patient_dob"),
                    doctor_name: text(row, "doctor"),
                    doa: text(row, "date"),
                    time_slot: text(row, "time"),
                    email: text(row, "email"),
                    phone_number: text(row, "phone"),
                    status,
                    form_filled: text(row, "form_filled"),
                    cancellation_reason: text(row, "cancellation_reason"),
                })
            })
            .collect())
    }
}

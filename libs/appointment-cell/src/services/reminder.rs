use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, instrument};

use notification_cell::{AppointmentDetails, NotificationProducer};
use shared_database::{StoreError, TableStore};
use shared_utils::parse_dmy;

use crate::models::{AppointmentError, ReminderReport, REMINDER_SCHEMA};

const FLAG_SENT: &str = "Yes";

/// Walks the ledger and queues the three pre-appointment messages.
///
/// Each reminder has its own tracking column, so a row is only ever
/// reminded once per stage no matter how often the sweep runs.
pub struct ReminderService {
    store: Arc<dyn TableStore>,
    notifications: Arc<NotificationProducer>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn TableStore>, notifications: Arc<NotificationProducer>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    #[instrument(skip(self))]
    pub async fn sweep(&self, today: NaiveDate) -> Result<ReminderReport, AppointmentError> {
        let mut report = ReminderReport::default();

        let mut table = match self.store.load().await {
            Ok(table) => table,
            Err(e) if e.is_missing() => {
                debug!("No ledger yet, nothing to remind");
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };

        let columns_before = table.columns.len();
        let columns = REMINDER_SCHEMA
            .resolve_for_write(&mut table)
            .map_err(StoreError::from)?;
        let mut changed = table.columns.len() != columns_before;

        for row in table.rows.iter_mut() {
            if columns.text(row, "status").as_deref() != Some("Confirmed") {
                continue;
            }
            let Some(date) = columns.text(row, "date").and_then(|raw| parse_dmy(&raw)) else {
                continue;
            };
            let days_until = (date - today).num_days();
            if days_until < 0 {
                continue;
            }
            report.rows_checked += 1;

            let details = AppointmentDetails {
                patient_name: columns.text(row, "patient_name").unwrap_or_default(),
                doctor: columns.text(row, "doctor").unwrap_or_default(),
                date: columns.text(row, "date").unwrap_or_default(),
                time: columns.text(row, "time").unwrap_or_default(),
            };
            let phone = columns.text(row, "phone").unwrap_or_default();
            let unsent = |key: &str| columns.text(row, key).is_none();

            let stage = match days_until {
                3 if unsent("reminder1") => Some("reminder1"),
                2 if unsent("reminder2") => Some("reminder2"),
                1 if unsent("reminder3") => Some("reminder3"),
                _ => None,
            };
            let Some(stage) = stage else {
                continue;
            };

            match stage {
                "reminder1" => {
                    self.notifications.appointment_reminder(&phone, &details).await;
                    report.first_reminders += 1;
                }
                "reminder2" => {
                    self.notifications
                        .intake_form_reminder(&phone, &details.patient_name)
                        .await;
                    report.second_reminders += 1;
                }
                _ => {
                    self.notifications
                        .attendance_check(&phone, &details.patient_name)
                        .await;
                    report.third_reminders += 1;
                }
            }
            columns.set(row, stage, FLAG_SENT);
            changed = true;
        }

        if changed {
            self.store.save(&table).await?;
            report.ledger_updated = true;
        }

        info!(
            "Reminder sweep checked {} booking(s): {} first, {} second, {} third",
            report.rows_checked, report.first_reminders, report.second_reminders, report.third_reminders
        );
        Ok(report)
    }

    /// Sweeps on a fixed interval, forever. Sweep failures are logged and the
    /// loop keeps going.
    pub async fn run_periodically(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let today = Local::now().date_naive();
            if let Err(e) = self.sweep(today).await {
                error!("Reminder sweep failed: {}", e);
            }
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use notification_cell::NotificationProducer;

use crate::models::{FinalizeOutcome, IntakeFormStatus};

/// Emails the new-patient intake form once a booking is confirmed.
pub struct IntakeFormService {
    notifications: Arc<NotificationProducer>,
    form_path: PathBuf,
}

impl IntakeFormService {
    pub fn new(notifications: Arc<NotificationProducer>, form_path: impl Into<PathBuf>) -> Self {
        Self {
            notifications,
            form_path: form_path.into(),
        }
    }

    pub fn form_path(&self) -> &PathBuf {
        &self.form_path
    }

    pub async fn send(&self, outcome: &FinalizeOutcome) -> IntakeFormStatus {
        let FinalizeOutcome::Confirmed { booking, patient } = outcome else {
            return IntakeFormStatus::SkippedNotConfirmed;
        };

        let email = booking.email.trim();
        if email.is_empty() {
            warn!("No email on booking for {}, intake form not sent", booking.patient_name);
            return IntakeFormStatus::ErrorNoEmailFound;
        }

        match tokio::fs::metadata(&self.form_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                error!("Intake form not found at {}", self.form_path.display());
                return IntakeFormStatus::ErrorFormNotFound(self.form_path.clone());
            }
        }

        match self
            .notifications
            .intake_form(email, &patient.name, self.form_path.clone())
            .await
        {
            Some(job_id) => {
                info!("Intake form for {} queued as job {}", patient.name, job_id);
                IntakeFormStatus::Queued
            }
            None => IntakeFormStatus::ErrorQueueUnavailable,
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::queue::OutboxQueue;
use crate::services::sender::format_phone_number;
use crate::{AppointmentDetails, Channel, NotificationJob, NotificationKind};

/// Composes patient-facing messages and places them on the outbox. Enqueue
/// problems are logged here and never reach the caller.
pub struct NotificationProducer {
    queue: Arc<OutboxQueue>,
    country_code: String,
}

impl NotificationProducer {
    pub fn new(queue: Arc<OutboxQueue>, country_code: impl Into<String>) -> Self {
        Self {
            queue,
            country_code: country_code.into(),
        }
    }

    pub fn queue(&self) -> &Arc<OutboxQueue> {
        &self.queue
    }

    async fn enqueue_sms(&self, phone: &str, kind: NotificationKind, body: String) -> Option<Uuid> {
        let Some(recipient) = format_phone_number(phone, &self.country_code) else {
            warn!("Cannot send {:?} SMS, no phone number provided", kind);
            return None;
        };
        self.enqueue(NotificationJob::new(Channel::Sms, kind, recipient, body))
            .await
    }

    async fn enqueue(&self, job: NotificationJob) -> Option<Uuid> {
        let kind = job.kind;
        match self.queue.enqueue_job(job).await {
            Ok(job_id) => {
                info!("{:?} notification queued as job {}", kind, job_id);
                Some(job_id)
            }
            Err(e) => {
                error!("Failed to queue {:?} notification: {}", kind, e);
                None
            }
        }
    }

    pub async fn booking_confirmed(&self, phone: &str, details: &AppointmentDetails) -> Option<Uuid> {
        let body = format!(
            "Hi. Thank you for using the scheduling assistant. Your appointment with {} on {} is confirmed. \
             Your time slot is {}. Please make sure to complete all necessary requirements and arrive 15 minutes early.",
            details.doctor, details.date, details.time
        );
        self.enqueue_sms(phone, NotificationKind::BookingConfirmed, body).await
    }

    pub async fn booking_cancelled(&self, phone: &str) -> Option<Uuid> {
        let body = "Your medical appointment has been successfully cancelled as requested.".to_string();
        self.enqueue_sms(phone, NotificationKind::BookingCancelled, body).await
    }

    pub async fn intake_form(&self, email: &str, patient_name: &str, form: PathBuf) -> Option<Uuid> {
        let email = email.trim();
        if email.is_empty() {
            warn!("Cannot send intake form, no email provided");
            return None;
        }
        let body = format!(
            "Dear {},\n\nThank you for scheduling your appointment with us. Please find the New Patient \
             Intake Form attached to this email.\n\nTo help us prepare for your visit, please complete this \
             form and either email it back to us or bring a printed copy to your appointment.\n\n\
             We look forward to seeing you soon.\n\nSincerely,\nThe Scheduling Team",
            patient_name
        );
        let job = NotificationJob::new(
            Channel::Email,
            NotificationKind::IntakeForm,
            email.to_string(),
            body,
        )
        .with_subject("Your New Patient Intake Form")
        .with_attachment(form);
        self.enqueue(job).await
    }

    pub async fn appointment_reminder(&self, phone: &str, details: &AppointmentDetails) -> Option<Uuid> {
        let body = format!(
            "Hello {}, this is a reminder of your appointment with {} on {} at {}.",
            details.patient_name, details.doctor, details.date, details.time
        );
        self.enqueue_sms(phone, NotificationKind::AppointmentReminder, body).await
    }

    pub async fn intake_form_reminder(&self, phone: &str, patient_name: &str) -> Option<Uuid> {
        let body = format!(
            "Hi {}, have you completed your intake form? Reply YES or NO.",
            patient_name
        );
        self.enqueue_sms(phone, NotificationKind::IntakeFormReminder, body).await
    }

    pub async fn attendance_check(&self, phone: &str, patient_name: &str) -> Option<Uuid> {
        let body = format!(
            "Reminder, {}, your appointment is tomorrow. Reply CONFIRM if you are coming or CANCEL to cancel.",
            patient_name
        );
        self.enqueue_sms(phone, NotificationKind::AttendanceCheck, body).await
    }
}

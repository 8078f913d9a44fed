use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
    IntakeForm,
    AppointmentReminder,
    IntakeFormReminder,
    AttendanceCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Queued,
    Delivering,
    Delivered,
    Failed,
    Retrying,
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationStatus::Delivered)
    }

    pub fn can_transition_to(&self, target: &NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, target),
            (Queued, Delivering)
                | (Delivering, Delivered)
                | (Delivering, Failed)
                | (Failed, Retrying)
                | (Retrying, Delivering)
        )
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationStatus::Queued => "queued",
            NotificationStatus::Delivering => "delivering",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Retrying => "retrying",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub job_id: Uuid,
    pub channel: Channel,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
    pub attachment: Option<PathBuf>,
    pub status: NotificationStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl NotificationJob {
    pub fn new(channel: Channel, kind: NotificationKind, recipient: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            channel,
            kind,
            recipient,
            subject: None,
            body,
            attachment: None,
            status: NotificationStatus::Queued,
            retry_count: 0,
            max_retries: 3,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            error_message: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_attachment(mut self, path: PathBuf) -> Self {
        self.attachment = Some(path);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries && self.status == NotificationStatus::Failed
    }

    /// Nothing further will happen to this job.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal() || (self.status == NotificationStatus::Failed && !self.can_retry())
    }
}

/// Appointment fields quoted in confirmation and reminder messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub patient_name: String,
    pub doctor: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued_jobs: u64,
    pub delivering_jobs: u64,
    pub delivered_jobs: u64,
    pub failed_jobs: u64,
    pub retried_jobs: u64,
    pub total_jobs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: u32,
    pub poll_timeout_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("notifier-{}", Uuid::new_v4()),
            concurrency: 2,
            poll_timeout_ms: 500,
            retry_delay_ms: 2_000,
        }
    }
}

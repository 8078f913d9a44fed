use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Outbox is closed")]
    QueueClosed,

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("No usable recipient: {0}")]
    MissingRecipient(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Maximum retry attempts ({max_retries}) exceeded for job {job_id}")]
    MaxRetriesExceeded { job_id: Uuid, max_retries: u32 },
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{NotificationError, NotificationJob, NotificationStatus, QueueStats};

/// In-process outbox. Job ids travel over an unbounded channel; the jobs
/// themselves live in a map so their status can be inspected after delivery.
pub struct OutboxQueue {
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Mutex<mpsc::UnboundedReceiver<Uuid>>,
    jobs: RwLock<HashMap<Uuid, NotificationJob>>,
    stats: RwLock<QueueStats>,
}

impl Default for OutboxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboxQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            jobs: RwLock::new(HashMap::new()),
            stats: RwLock::new(QueueStats::default()),
        }
    }

    pub async fn enqueue_job(&self, job: NotificationJob) -> Result<Uuid, NotificationError> {
        let job_id = job.job_id;
        self.jobs.write().await.insert(job_id, job);
        self.sender
            .send(job_id)
            .map_err(|_| NotificationError::QueueClosed)?;

        let mut stats = self.stats.write().await;
        stats.queued_jobs += 1;
        stats.total_jobs += 1;

        debug!("Job {} enqueued", job_id);
        Ok(job_id)
    }

    /// Waits up to `wait` for the next job and marks it `Delivering`.
    pub async fn dequeue_job(&self, wait: Duration) -> Option<NotificationJob> {
        let job_id = {
            let mut receiver = self.receiver.lock().await;
            match tokio::time::timeout(wait, receiver.recv()).await {
                Ok(Some(job_id)) => job_id,
                _ => return None,
            }
        };

        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            warn!("Dequeued unknown job {}", job_id);
            return None;
        };
        let from = job.status;
        if !from.can_transition_to(&NotificationStatus::Delivering) {
            warn!("Job {} dequeued in state {}, skipping", job_id, from);
            return None;
        }
        job.status = NotificationStatus::Delivering;
        job.updated_at = Utc::now();
        let snapshot = job.clone();
        drop(jobs);

        let mut stats = self.stats.write().await;
        if from == NotificationStatus::Queued {
            stats.queued_jobs = stats.queued_jobs.saturating_sub(1);
        }
        stats.delivering_jobs += 1;
        Some(snapshot)
    }

    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        status: NotificationStatus,
        error_message: Option<String>,
    ) -> Result<(), NotificationError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(NotificationError::JobNotFound(job_id))?;

        if !job.status.can_transition_to(&status) {
            return Err(NotificationError::InvalidStatusTransition {
                from: job.status.to_string(),
                to: status.to_string(),
            });
        }

        let from = job.status;
        job.status = status;
        job.updated_at = Utc::now();
        if status == NotificationStatus::Delivered {
            job.delivered_at = Some(job.updated_at);
        }
        if error_message.is_some() {
            job.error_message = error_message;
        }
        drop(jobs);

        let mut stats = self.stats.write().await;
        if from == NotificationStatus::Delivering {
            stats.delivering_jobs = stats.delivering_jobs.saturating_sub(1);
        }
        match status {
            NotificationStatus::Delivered => stats.delivered_jobs += 1,
            NotificationStatus::Failed => stats.failed_jobs += 1,
            _ => {}
        }
        Ok(())
    }

    /// Puts a failed job back on the queue.
    pub async fn retry_job(&self, job_id: Uuid) -> Result<(), NotificationError> {
        {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(&job_id)
                .ok_or(NotificationError::JobNotFound(job_id))?;
            if !job.can_retry() {
                return Err(NotificationError::MaxRetriesExceeded {
                    job_id,
                    max_retries: job.max_retries,
                });
            }
            job.status = NotificationStatus::Retrying;
            job.retry_count += 1;
            job.updated_at = Utc::now();
        }

        self.sender
            .send(job_id)
            .map_err(|_| NotificationError::QueueClosed)?;

        let mut stats = self.stats.write().await;
        stats.failed_jobs = stats.failed_jobs.saturating_sub(1);
        stats.retried_jobs += 1;
        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid) -> Option<NotificationJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// All jobs, oldest first.
    pub async fn jobs(&self) -> Vec<NotificationJob> {
        let mut jobs: Vec<NotificationJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub async fn get_queue_stats(&self) -> QueueStats {
        self.stats.read().await.clone()
    }

    /// Drops settled jobs (delivered, or failed with no retries left) last
    /// touched before `now - retention`. Counters in the stats are kept.
    pub async fn cleanup_expired_jobs(&self, retention: chrono::Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.is_settled() && job.updated_at < cutoff));
        let cleaned = before - jobs.len();

        if cleaned > 0 {
            info!("Cleaned up {} expired notification job(s)", cleaned);
        } else {
            debug!("No expired notification jobs to clean up");
        }
        cleaned
    }

    pub async fn run_cleanup(self: Arc<Self>, retention: chrono::Duration, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.cleanup_expired_jobs(retention, Utc::now()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, NotificationKind};
    use assert_matches::assert_matches;

    fn job() -> NotificationJob {
        NotificationJob::new(
            Channel::Sms,
            NotificationKind::BookingCancelled,
            "+919876543210".to_string(),
            "cancelled".to_string(),
        )
    }

    #[tokio::test]
    async fn test_dequeue_marks_delivering() {
        let queue = OutboxQueue::new();
        let id = queue.enqueue_job(job()).await.unwrap();

        let dequeued = queue.dequeue_job(Duration::from_millis(10)).await.unwrap();

        assert_eq!(dequeued.job_id, id);
        assert_eq!(dequeued.status, NotificationStatus::Delivering);
        let stats = queue.get_queue_stats().await;
        assert_eq!((stats.queued_jobs, stats.delivering_jobs), (0, 1));
    }

    #[tokio::test]
    async fn test_empty_queue_times_out() {
        let queue = OutboxQueue::new();
        assert!(queue.dequeue_job(Duration::from_millis(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_illegal_transition() {
        let queue = OutboxQueue::new();
        let id = queue.enqueue_job(job()).await.unwrap();

        let result = queue
            .update_job_status(id, NotificationStatus::Delivered, None)
            .await;

        assert_matches!(result, Err(NotificationError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn test_retry_requires_failed_job() {
        let queue = OutboxQueue::new();
        let id = queue.enqueue_job(job()).await.unwrap();
        assert_matches!(
            queue.retry_job(id).await,
            Err(NotificationError::MaxRetriesExceeded { .. })
        );

        queue.dequeue_job(Duration::from_millis(10)).await.unwrap();
        queue
            .update_job_status(id, NotificationStatus::Failed, Some("boom".to_string()))
            .await
            .unwrap();
        queue.retry_job(id).await.unwrap();

        let retried = queue.dequeue_job(Duration::from_millis(10)).await.unwrap();
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_cleanup_evicts_only_old_settled_jobs() {
        let queue = OutboxQueue::new();
        let delivered = queue.enqueue_job(job()).await.unwrap();
        let exhausted = queue.enqueue_job(job()).await.unwrap();
        let pending = queue.enqueue_job(job()).await.unwrap();

        queue.dequeue_job(Duration::from_millis(10)).await.unwrap();
        queue
            .update_job_status(delivered, NotificationStatus::Delivered, None)
            .await
            .unwrap();
        queue.dequeue_job(Duration::from_millis(10)).await.unwrap();
        queue
            .update_job_status(exhausted, NotificationStatus::Failed, Some("down".to_string()))
            .await
            .unwrap();
        queue.jobs.write().await.get_mut(&exhausted).unwrap().retry_count = 3;

        let retention = chrono::Duration::hours(1);
        assert_eq!(queue.cleanup_expired_jobs(retention, Utc::now()).await, 0);

        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(queue.cleanup_expired_jobs(retention, later).await, 2);
        assert!(queue.get_job(delivered).await.is_none());
        assert!(queue.get_job(exhausted).await.is_none());
        assert!(queue.get_job(pending).await.is_some());
        assert_eq!(queue.get_queue_stats().await.delivered_jobs, 1);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_failed_job_that_can_retry() {
        let queue = OutboxQueue::new();
        let id = queue.enqueue_job(job()).await.unwrap();
        queue.dequeue_job(Duration::from_millis(10)).await.unwrap();
        queue
            .update_job_status(id, NotificationStatus::Failed, None)
            .await
            .unwrap();

        let later = Utc::now() + chrono::Duration::days(30);
        assert_eq!(queue.cleanup_expired_jobs(chrono::Duration::hours(1), later).await, 0);
        assert!(queue.get_job(id).await.is_some());
    }
}

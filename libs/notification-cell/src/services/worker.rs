use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::services::queue::OutboxQueue;
use crate::services::sender::NotificationSender;
use crate::{NotificationError, NotificationJob, NotificationStatus, WorkerConfig};

/// Drains the outbox through a [`NotificationSender`], retrying failed deliveries
/// up to each job's `max_retries`.
pub struct NotificationWorker {
    config: WorkerConfig,
    queue: Arc<OutboxQueue>,
    sender: Arc<dyn NotificationSender>,
    is_shutdown: RwLock<bool>,
}

impl NotificationWorker {
    pub fn new(config: WorkerConfig, queue: Arc<OutboxQueue>, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            config,
            queue,
            sender,
            is_shutdown: RwLock::new(false),
        }
    }

    /// Runs `concurrency` delivery loops until [`shutdown`](Self::shutdown) is called.
    #[instrument(skip(self))]
    pub async fn start(self: Arc<Self>) -> Result<(), NotificationError> {
        info!("Starting notification worker {}", self.config.worker_id);

        let handles: Vec<_> = (0..self.config.concurrency.max(1))
            .map(|i| {
                let worker = Arc::clone(&self);
                let worker_name = format!("{}-{}", self.config.worker_id, i);
                tokio::spawn(async move { worker.worker_loop(worker_name).await })
            })
            .collect();

        if let Err(e) = futures::future::try_join_all(handles).await {
            error!("Notification worker loop panicked: {}", e);
        }

        info!("Notification worker {} stopped", self.config.worker_id);
        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("Initiating shutdown for notification worker {}", self.config.worker_id);
        *self.is_shutdown.write().await = true;
    }

    async fn worker_loop(&self, worker_name: String) {
        debug!("Worker loop started: {}", worker_name);
        let poll = Duration::from_millis(self.config.poll_timeout_ms);

        loop {
            if *self.is_shutdown.read().await {
                debug!("Worker {} received shutdown signal", worker_name);
                break;
            }

            if let Some(job) = self.queue.dequeue_job(poll).await {
                if let Err(e) = self.process_job(job).await {
                    error!("Worker {} failed to process job: {}", worker_name, e);
                }
            }
        }

        debug!("Worker loop ended: {}", worker_name);
    }

    /// Delivers whatever is queued right now, including retries, then returns the
    /// number of jobs handled.
    pub async fn drain(&self) -> usize {
        let mut handled = 0;
        while let Some(job) = self.queue.dequeue_job(Duration::from_millis(1)).await {
            if let Err(e) = self.process_job(job).await {
                error!("Failed to process job while draining: {}", e);
            }
            handled += 1;
        }
        handled
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    async fn process_job(&self, job: NotificationJob) -> Result<(), NotificationError> {
        match self.sender.deliver(&job).await {
            Ok(()) => {
                self.queue
                    .update_job_status(job.job_id, NotificationStatus::Delivered, None)
                    .await?;
                debug!("Job {} delivered to {}", job.job_id, job.recipient);
            }
            Err(e) => {
                let error_msg = e.to_string();
                self.queue
                    .update_job_status(job.job_id, NotificationStatus::Failed, Some(error_msg.clone()))
                    .await?;
                error!("Job {} failed: {}", job.job_id, error_msg);

                if job.retry_count < job.max_retries {
                    warn!(
                        "Job {} will be retried (attempt {}/{})",
                        job.job_id,
                        job.retry_count + 1,
                        job.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    self.queue.retry_job(job.job_id).await?;
                }
            }
        }
        Ok(())
    }
}

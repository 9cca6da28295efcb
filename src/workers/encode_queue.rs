use crate::modules::media::repository::{StatusStore, StoreError};
use crate::workers::hls_encoder::VideoEncoder;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the driver does with a job whose encode failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the failed job at the head and stop draining. Every job queued
    /// behind it stays Pending.
    #[default]
    Halt,
    /// Drop the failed job (its source file stays on disk) and continue.
    /// Halts instead when the Failed status could not be written.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(FailurePolicy::Halt),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(format!("Unknown encode failure policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    pub name: String,
    pub source_path: PathBuf,
}

impl EncodeJob {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Encoded,
    /// The Failed status was written.
    Failed,
    /// The Failed status write itself failed.
    FailedUnrecorded,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Source video {0} does not exist or is not a file")]
    SourceMissing(PathBuf),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Shared {
    pending: Mutex<VecDeque<EncodeJob>>,
    wake: Notify,
    encoding: AtomicBool,
    halted: AtomicBool,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, VecDeque<EncodeJob>> {
        // A poisoned lock only means a panic elsewhere; the deque itself is intact.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to the process-wide encoding queue.
///
/// Jobs run strictly one at a time in FIFO order on a single driver task, so
/// there is never more than one encode (and one Processing record) in flight.
#[derive(Clone)]
pub struct EncodeQueue {
    shared: Arc<Shared>,
    store: Arc<dyn StatusStore>,
}

impl EncodeQueue {
    /// Spawns the driver task and returns the handle plus the driver's join
    /// handle. The driver exits once `shutdown` is cancelled, never in the
    /// middle of an encode.
    pub fn start(
        store: Arc<dyn StatusStore>,
        encoder: Arc<dyn VideoEncoder>,
        policy: FailurePolicy,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let shared = Arc::new(Shared {
            pending: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            encoding: AtomicBool::new(false),
            halted: AtomicBool::new(false),
        });

        let driver = Driver {
            shared: shared.clone(),
            store: store.clone(),
            encoder,
            policy,
        };
        let handle = tokio::spawn(driver.run(shutdown));

        (Self { shared, store }, handle)
    }

    /// Records the job as Pending and appends it to the queue. Returns as soon
    /// as the job is queued; the encode itself happens on the driver task.
    pub async fn enqueue(&self, job: EncodeJob) -> Result<(), QueueError> {
        let is_file = tokio::fs::metadata(&job.source_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(QueueError::SourceMissing(job.source_path));
        }

        // The record must exist before the driver can try to mark it Processing.
        self.store.create_pending(&job.name).await?;

        info!(name = %job.name, source = %job.source_path.display(), "📦 Queued encode job");
        self.shared.pending().push_back(job);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Snapshot of the jobs not yet dequeued, head first.
    pub fn pending(&self) -> Vec<EncodeJob> {
        self.shared.pending().iter().cloned().collect()
    }

    pub fn is_encoding(&self) -> bool {
        self.shared.encoding.load(Ordering::SeqCst)
    }

    /// True once a failure under [`FailurePolicy::Halt`] has stopped the driver.
    pub fn is_halted(&self) -> bool {
        self.shared.halted.load(Ordering::SeqCst)
    }
}

struct Driver {
    shared: Arc<Shared>,
    store: Arc<dyn StatusStore>,
    encoder: Arc<dyn VideoEncoder>,
    policy: FailurePolicy,
}

impl Driver {
    async fn run(self, shutdown: CancellationToken) {
        info!(policy = ?self.policy, "🎥 Encode queue driver started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.shared.wake.notified() => {}
            }

            if self.shared.halted.load(Ordering::SeqCst) {
                debug!("Encode queue is halted on a failed job, ignoring wake-up");
                continue;
            }

            self.drain(&shutdown).await;
        }

        info!("Encode queue driver stopped");
    }

    async fn drain(&self, shutdown: &CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let head = self.shared.pending().front().cloned();
            let Some(job) = head else {
                info!("Encode video queue is empty");
                return;
            };

            self.shared.encoding.store(true, Ordering::SeqCst);
            let outcome = self.process(&job).await;
            self.shared.encoding.store(false, Ordering::SeqCst);

            match (outcome, self.policy) {
                (JobOutcome::Encoded, _) => continue,
                (JobOutcome::Failed, FailurePolicy::Skip) => {
                    self.pop_head(&job);
                    warn!(name = %job.name, "Skipping failed encode job");
                }
                (JobOutcome::Failed, FailurePolicy::Halt) | (JobOutcome::FailedUnrecorded, _) => {
                    // An unrecorded failure leaves the row in Processing, so
                    // starting the next job would put two rows there.
                    self.shared.halted.store(true, Ordering::SeqCst);
                    warn!(
                        name = %job.name,
                        policy = ?self.policy,
                        recorded = outcome == JobOutcome::Failed,
                        waiting = self.shared.pending().len().saturating_sub(1),
                        "Encode queue halted on failed job"
                    );
                    return;
                }
            }
        }
    }

    /// Runs one job to its terminal status.
    async fn process(&self, job: &EncodeJob) -> JobOutcome {
        if let Err(e) = self.store.set_processing(&job.name).await {
            error!(name = %job.name, error = %e, "Failed to mark video as processing");
            return self.mark_failed(job, &e.to_string()).await;
        }

        info!(name = %job.name, "Encoding video {}", job.source_path.display());

        match self.encoder.encode(&job.source_path).await {
            Ok(master) => {
                self.pop_head(job);

                if let Err(e) = tokio::fs::remove_file(&job.source_path).await {
                    warn!(name = %job.name, error = %e, "Failed to delete encoded source file");
                }

                if let Err(e) = self.store.set_success(&job.name).await {
                    error!(name = %job.name, error = %e, "Failed to mark video as encoded");
                }

                info!(name = %job.name, master = %master.display(), "✅ Encode video success");
                JobOutcome::Encoded
            }
            Err(e) => {
                error!(name = %job.name, error = %e, "❌ Encode video failed");
                self.mark_failed(job, &e.to_string()).await
            }
        }
    }

    async fn mark_failed(&self, job: &EncodeJob, message: &str) -> JobOutcome {
        match self.store.set_failed(&job.name, message).await {
            Ok(_) => JobOutcome::Failed,
            Err(e) => {
                error!(name = %job.name, error = %e, "Failed to update video status to failed");
                JobOutcome::FailedUnrecorded
            }
        }
    }

    fn pop_head(&self, job: &EncodeJob) {
        let mut pending = self.shared.pending();
        if pending.front() == Some(job) {
            pending.pop_front();
        }
    }
}

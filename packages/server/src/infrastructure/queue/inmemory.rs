//! インメモリ JobQueue 実装
//!
//! mpsc チャネルを待ち行列として使い、ディスパッチャが Semaphore で
//! 同時実行数を制限しながらジョブをワーカータスクに渡します。
//!
//! - 配信は at-least-once。ハンドラが失敗したジョブは指数バックオフ後に再投入される
//! - 試行回数の上限に達したジョブは失敗ジョブとして保持され、捨てられない
//! - `start` 前に投入されたジョブは待機状態のまま保持される
//! - 停止時に未処理のジョブ、停止後に届いた再試行は失敗ジョブとして保持される

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, Semaphore, mpsc, watch},
    task::JoinHandle,
};

use crate::domain::{
    FailedJob, JobError, JobHandler, JobId, JobOptions, JobQueue, QueueError, QueueStatus,
    Timestamp, TranslationJob,
};

const SHUTDOWN_REASON: &str = "queue shut down";

/// 待ち行列上のジョブ
#[derive(Debug, Clone)]
struct QueuedJob {
    id: JobId,
    job: TranslationJob,
    options: JobOptions,
    attempts_made: u32,
}

#[derive(Default)]
struct Counters {
    waiting: AtomicUsize,
    active: AtomicUsize,
    delayed: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> QueueStatus {
        QueueStatus {
            waiting: self.waiting.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            delayed: self.delayed.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// ワーカータスクとディスパッチャで共有する状態
struct Shared {
    sender: mpsc::UnboundedSender<QueuedJob>,
    counters: Counters,
    failed_jobs: Mutex<Vec<FailedJob>>,
}

/// インメモリ JobQueue 実装
pub struct InMemoryJobQueue {
    shared: Arc<Shared>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<QueuedJob>>>,
    next_id: AtomicU64,
    concurrency: usize,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl InMemoryJobQueue {
    /// `concurrency` is the maximum number of jobs processed at once (at least 1)
    pub fn new(concurrency: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                sender,
                counters: Counters::default(),
                failed_jobs: Mutex::new(Vec::new()),
            }),
            receiver: Mutex::new(Some(receiver)),
            next_id: AtomicU64::new(1),
            concurrency: concurrency.max(1),
            closed: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Start the dispatcher that feeds jobs to `handler`.
    ///
    /// # Errors
    ///
    /// `QueueError::AlreadyStarted` when called a second time
    pub async fn start(
        &self,
        handler: Arc<dyn JobHandler>,
    ) -> Result<JoinHandle<()>, QueueError> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(QueueError::AlreadyStarted)?;

        let shared = self.shared.clone();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut shutdown = self.shutdown.subscribe();
        let concurrency = self.concurrency;

        let handle = tokio::spawn(async move {
            tracing::info!("Job queue started with {} worker(s)", concurrency);
            loop {
                let queued = tokio::select! {
                    _ = shutdown.changed() => break,
                    queued = receiver.recv() => match queued {
                        Some(queued) => queued,
                        None => break,
                    },
                };

                let permit = tokio::select! {
                    _ = shutdown.changed() => {
                        park_unstarted(&shared, queued).await;
                        break;
                    }
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => {
                            park_unstarted(&shared, queued).await;
                            break;
                        }
                    },
                };

                shared.counters.waiting.fetch_sub(1, Ordering::SeqCst);
                shared.counters.active.fetch_add(1, Ordering::SeqCst);

                let shared = shared.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    let result = handler.handle(&queued.job).await;
                    drop(permit);
                    shared.counters.active.fetch_sub(1, Ordering::SeqCst);
                    settle(&shared, queued, result).await;
                });
            }

            receiver.close();
            while let Ok(queued) = receiver.try_recv() {
                park_unstarted(&shared, queued).await;
            }
            tracing::info!("Job queue dispatcher stopped");
        });

        Ok(handle)
    }

    /// Stop accepting jobs and stop the dispatcher. In-flight jobs run to completion;
    /// jobs that have not started are parked as failed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }
}

/// ハンドラの結果を反映する。失敗時は再投入または失敗ジョブとして保持する
async fn settle(shared: &Shared, queued: QueuedJob, result: Result<(), JobError>) {
    let error = match result {
        Ok(()) => {
            shared.counters.completed.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Job {} completed", queued.id);
            return;
        }
        Err(error) => error,
    };

    let attempts_made = queued.attempts_made + 1;
    if attempts_made >= queued.options.max_attempts {
        tracing::error!(
            "Job {} failed permanently after {} attempt(s) (room: {}, message: {}, target: {}): {}",
            queued.id,
            attempts_made,
            queued.job.room_id,
            queued.job.message_id,
            queued.job.target_language,
            error
        );
        let exhausted = QueuedJob {
            attempts_made,
            ..queued
        };
        park(shared, exhausted, error.to_string()).await;
        return;
    }

    let delay = queued.options.backoff_delay(attempts_made);
    tracing::warn!(
        "Job {} attempt {} failed, retrying in {:?}: {}",
        queued.id,
        attempts_made,
        delay,
        error
    );
    shared.counters.delayed.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(delay).await;
    shared.counters.delayed.fetch_sub(1, Ordering::SeqCst);

    shared.counters.waiting.fetch_add(1, Ordering::SeqCst);
    let retry = QueuedJob {
        attempts_made,
        ..queued
    };
    if let Err(mpsc::error::SendError(retry)) = shared.sender.send(retry) {
        shared.counters.waiting.fetch_sub(1, Ordering::SeqCst);
        tracing::warn!(
            "Job {} parked after {} attempt(s): {} (last error: {})",
            retry.id,
            retry.attempts_made,
            SHUTDOWN_REASON,
            error
        );
        park(shared, retry, SHUTDOWN_REASON.to_string()).await;
    }
}

/// 待機中のまま停止を迎えたジョブを失敗ジョブとして保持する
async fn park_unstarted(shared: &Shared, queued: QueuedJob) {
    shared.counters.waiting.fetch_sub(1, Ordering::SeqCst);
    tracing::warn!("Job {} parked: {}", queued.id, SHUTDOWN_REASON);
    park(shared, queued, SHUTDOWN_REASON.to_string()).await;
}

async fn park(shared: &Shared, queued: QueuedJob, last_error: String) {
    shared.counters.failed.fetch_add(1, Ordering::SeqCst);
    shared.failed_jobs.lock().await.push(FailedJob {
        id: queued.id,
        job: queued.job,
        attempts_made: queued.attempts_made,
        last_error,
        failed_at: Timestamp::now(),
    });
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: TranslationJob, options: JobOptions) -> Result<JobId, QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let id = JobId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.counters.waiting.fetch_add(1, Ordering::SeqCst);
        let queued = QueuedJob {
            id,
            job,
            options,
            attempts_made: 0,
        };
        if self.shared.sender.send(queued).is_err() {
            self.shared.counters.waiting.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }

        tracing::debug!("Job {} enqueued", id);
        Ok(id)
    }

    async fn status(&self) -> QueueStatus {
        self.shared.counters.snapshot()
    }

    async fn failed_jobs(&self) -> Vec<FailedJob> {
        self.shared.failed_jobs.lock().await.clone()
    }
}

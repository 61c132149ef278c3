// * Bounded resolution pool
// * Fixed number of workers draining a bounded queue; a full queue rejects instead of blocking

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type Job = BoxFuture<'static, ()>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("Resolution queue is full ({0} pending)")]
    QueueFull(usize),

    #[error("Resolution pool is shut down")]
    Shutdown,
}

#[derive(Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` tasks. Must be called inside a tokio runtime.
    pub fn new(workers: usize, capacity: usize, token: CancellationToken) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(AtomicUsize::new(0));

        let workers = (0..workers.max(1))
            .map(|id| {
                let receiver = receiver.clone();
                let pending = pending.clone();
                let token = token.clone();
                tokio::spawn(Self::worker_loop(id, receiver, pending, token))
            })
            .collect();

        Self {
            sender,
            pending,
            capacity,
            token,
            workers,
        }
    }

    async fn worker_loop(
        id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
        pending: Arc<AtomicUsize>,
        token: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                job = async { receiver.lock().await.recv().await } => job,
            };

            let Some(job) = job else { break };
            pending.fetch_sub(1, Ordering::Relaxed);

            if token.is_cancelled() {
                break;
            }
            job.await;
        }
        debug!(worker = id, "Resolution worker stopped");
    }

    /// Queues a job without waiting. A full queue drops the job.
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        if self.token.is_cancelled() {
            return Err(PoolError::Shutdown);
        }

        self.pending.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.pending.fetch_sub(1, Ordering::Relaxed);
                match err {
                    mpsc::error::TrySendError::Full(_) => Err(PoolError::QueueFull(self.capacity)),
                    mpsc::error::TrySendError::Closed(_) => Err(PoolError::Shutdown),
                }
            }
        }
    }

    /// Jobs queued but not yet picked up by a worker
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    // * Cancels the workers; queued jobs are discarded, running jobs observe the token
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

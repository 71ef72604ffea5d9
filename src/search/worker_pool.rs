//! Fixed-size worker pool used for parallel sibling search and perft.
//!
//! Workers block on one mutex/condvar pair guarding a FIFO of boxed jobs.
//! `submit` returns a one-shot `TaskHandle`; `join` blocks until the job has
//! run. Shutdown lets the workers drain whatever is still queued, then joins
//! them. Dropping the pool shuts it down.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use thiserror::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    #[error("task result was dropped before completion")]
    ResultLost,
}

#[derive(Default)]
struct PoolQueue {
    jobs: VecDeque<Job>,
    shutting_down: bool,
}

#[derive(Default)]
struct PoolShared {
    queue: Mutex<PoolQueue>,
    available: Condvar,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolQueue> {
        // Jobs run outside the lock under catch_unwind, so a poisoned queue still holds valid data.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

/// One-shot result of a submitted job.
#[must_use = "a task handle should be joined to observe the task result"]
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T, PoolError>>,
}

impl<T> TaskHandle<T> {
    pub fn join(self) -> Result<T, PoolError> {
        self.receiver.recv().map_err(|_| PoolError::ResultLost)?
    }
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let shared = Arc::new(PoolShared::default());
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let shared_ref = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("quince-worker-{index}"))
                .spawn(move || worker_loop(shared_ref));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    let mut partial = WorkerPool { shared, workers };
                    partial.shutdown();
                    return Err(PoolError::Spawn(err));
                }
            }
        }
        log::debug!("worker pool started with {threads} threads");
        Ok(Self { shared, workers })
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| PoolError::TaskPanicked(panic_message(payload.as_ref())));
            // The handle may have been dropped; nobody is waiting then.
            let _ = sender.send(outcome);
        });

        let mut queue = self.shared.lock();
        if queue.shutting_down {
            return Err(PoolError::ShutDown);
        }
        queue.jobs.push_back(job);
        drop(queue);
        self.shared.available.notify_one();
        Ok(TaskHandle { receiver })
    }

    /// Stop accepting jobs, let workers drain the queue, and join them.
    pub fn shutdown(&mut self) {
        self.shared.lock().shutting_down = true;
        self.shared.available.notify_all();
        let joined = self.workers.len();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if joined > 0 {
            log::debug!("worker pool joined {joined} threads");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let job = {
            let mut queue = shared.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutting_down {
                    return;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        job();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{PoolError, WorkerPool};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn drains_every_submitted_task() {
        let pool = WorkerPool::new(4).expect("pool should start");
        let handles: Vec<_> = (0..100u64)
            .map(|i| pool.submit(move || i * i).expect("submit should succeed"))
            .collect();
        let total: u64 = handles
            .into_iter()
            .map(|h| h.join().expect("task should finish"))
            .sum();
        assert_eq!(total, (0..100u64).map(|i| i * i).sum());
    }

    #[test]
    fn panicking_task_reports_error_and_pool_survives() {
        let pool = WorkerPool::new(1).expect("pool should start");
        let bad = pool
            .submit(|| -> u32 { panic!("boom") })
            .expect("submit should succeed");
        match bad.join() {
            Err(PoolError::TaskPanicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected panic error, got {other:?}"),
        }
        let good = pool.submit(|| 7u32).expect("submit should succeed");
        assert_eq!(good.join().expect("task should finish"), 7);
    }

    #[test]
    fn shutdown_drains_queue_then_rejects_new_work() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2).expect("pool should start");
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            let _ = pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::Relaxed), 50);
        assert!(matches!(pool.submit(|| ()), Err(PoolError::ShutDown)));
        assert_eq!(pool.thread_count(), 0);
    }
}

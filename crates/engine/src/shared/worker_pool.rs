use futures::future::join_all;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, Mutex},
    time::Instant,
};
use tracing::error;

/// A fixed number of workers consuming a bounded job queue. The number of
/// candidates processed at the same time never exceeds the pool size.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    queue_capacity: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub started: usize,
    /// Items that were dequeued after the deadline and never handled
    pub not_started: usize,
}

impl WorkerPool {
    pub fn new(size: usize, queue_capacity: usize) -> Self {
        Self {
            size: std::cmp::max(size, 1),
            queue_capacity: std::cmp::max(queue_capacity, 1),
        }
    }

    /// Runs `handler` for every item and waits for all workers to finish.
    /// No item is started after `deadline`, but items already started are
    /// allowed to complete.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, deadline: Instant, handler: F) -> PoolReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<T>(self.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);
        let started = Arc::new(AtomicUsize::new(0));
        let not_started = Arc::new(AtomicUsize::new(0));

        let workers = (0..self.size)
            .map(|_| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let started = started.clone();
                let not_started = not_started.clone();
                tokio::spawn(async move {
                    loop {
                        let item = { receiver.lock().await.recv().await };
                        let item = match item {
                            Some(item) => item,
                            None => break,
                        };
                        if Instant::now() >= deadline {
                            not_started.fetch_add(1, Ordering::SeqCst);
                            continue;
                        }
                        started.fetch_add(1, Ordering::SeqCst);
                        (*handler)(item).await;
                    }
                })
            })
            .collect::<Vec<_>>();

        let total = items.len();
        for (queued, item) in items.into_iter().enumerate() {
            if sender.send(item).await.is_err() {
                error!("All workers stopped, {} items were not queued", total - queued);
                not_started.fetch_add(total - queued, Ordering::SeqCst);
                break;
            }
        }
        // Closing the queue lets the workers exit once it is drained
        drop(sender);

        for res in join_all(workers).await {
            if let Err(e) = res {
                error!("Worker stopped unexpectedly: {:?}", e);
            }
        }

        PoolReport {
            started: started.load(Ordering::SeqCst),
            not_started: not_started.load(Ordering::SeqCst),
        }
    }
}

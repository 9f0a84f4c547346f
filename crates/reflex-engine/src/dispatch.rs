//! Best-effort background dispatch for fire-and-forget work: training
//! callbacks and stream ingestion. Bounded queue; when full, the job is
//! dropped with a warning instead of applying backpressure to the
//! resolution path.

use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

const QUEUE_DEPTH: usize = 256;

pub struct Dispatcher {
    sender: Option<SyncSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = sync_channel::<Job>(QUEUE_DEPTH);
        let worker = std::thread::Builder::new()
            .name("reflex-dispatch".to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            })
            .ok();
        if worker.is_none() {
            tracing::warn!("dispatch worker failed to start, background jobs will be dropped");
        }
        Self {
            sender: Some(sender),
            worker,
        }
    }

    /// Queue a job. Drops it (with a warning) when the queue is full or
    /// the worker is gone; never blocks the caller.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(Box::new(job)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("dispatch queue full, dropping background job");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("dispatch worker gone, dropping background job");
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what was queued.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// Index worker pool
// A fixed number of threads pull jobs from a bounded channel. The sender
// blocks when the channel is full, so the walk runs at the workers' pace.
// A panic inside a job is caught and counted; the worker moves on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};

use super::job::{index_job, IndexJob};

#[derive(Debug, Default)]
struct Counters {
    indexed: AtomicUsize,
    files: AtomicUsize,
    failed: AtomicUsize,
}

/// Totals once every worker has finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Groups written to the catalog
    pub indexed: usize,
    /// Files in those groups
    pub files: usize,
    pub failed: usize,
}

pub struct WorkerPool {
    sender: Option<Sender<IndexJob>>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub fn spawn(workers: usize, catalog: Arc<dyn Catalog>) -> Result<Self> {
        let workers = workers.max(1);
        let (sender, receiver) = bounded::<IndexJob>(workers);
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let receiver = receiver.clone();
            let catalog = Arc::clone(&catalog);
            let counters = Arc::clone(&counters);
            let handle = std::thread::Builder::new()
                .name(format!("index-worker-{}", n))
                .spawn(move || worker_loop(receiver, catalog, counters))?;
            handles.push(handle);
        }

        log::debug!("Indexer: started {} workers", workers);
        Ok(Self {
            sender: Some(sender),
            handles,
            counters,
        })
    }

    /// Queue a job, blocking while the channel is full
    pub fn dispatch(&self, job: IndexJob) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(CatalogError::Other("worker pool already finished".to_string()));
        };
        sender
            .send(job)
            .map_err(|_| CatalogError::Other("index workers are gone".to_string()))
    }

    /// Close the channel and wait for queued jobs to complete
    pub fn finish(mut self) -> WorkerStats {
        drop(self.sender.take());
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Indexer: worker thread exited abnormally");
            }
        }

        WorkerStats {
            indexed: self.counters.indexed.load(Ordering::Acquire),
            files: self.counters.files.load(Ordering::Acquire),
            failed: self.counters.failed.load(Ordering::Acquire),
        }
    }
}

fn worker_loop(receiver: Receiver<IndexJob>, catalog: Arc<dyn Catalog>, counters: Arc<Counters>) {
    for job in receiver.iter() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| index_job(&job, catalog.as_ref())));

        match result {
            Ok(Ok(done)) => {
                counters.indexed.fetch_add(1, Ordering::AcqRel);
                counters.files.fetch_add(done.files, Ordering::AcqRel);
            }
            Ok(Err(e)) => {
                log::error!("Indexer: {} in {}", e, job.file_name);
                counters.failed.fetch_add(1, Ordering::AcqRel);
            }
            Err(payload) => {
                log::error!(
                    "Indexer: panic while indexing {}: {}\n{}",
                    job.file_name,
                    panic_message(payload.as_ref()),
                    std::backtrace::Backtrace::force_capture()
                );
                counters.failed.fetch_add(1, Ordering::AcqRel);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}

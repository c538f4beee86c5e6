// Run-lock and cancellation flag for one indexing subsystem

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CatalogError, Result};

#[derive(Debug, Default)]
pub struct RunController {
    running: AtomicBool,
    canceled: AtomicBool,
}

impl RunController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the run-lock; fails if a run is already in progress.
    /// A fresh run starts uncanceled.
    pub fn try_start(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CatalogError::AlreadyRunning(
                "another index run is in progress".to_string(),
            ));
        }
        self.canceled.store(false, Ordering::Release);
        Ok(())
    }

    /// Lock held until the guard is dropped
    pub fn start(self: &Arc<Self>) -> Result<RunGuard> {
        self.try_start()?;
        Ok(RunGuard {
            controller: Arc::clone(self),
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn cancel(&self) {
        if self.is_running() {
            log::info!("Indexer: cancel requested");
        }
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

pub struct RunGuard {
    controller: Arc<RunController>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.controller.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_run() {
        let controller = RunController::new();
        let guard = controller.start().unwrap();
        assert!(controller.is_running());

        let err = controller.try_start().unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyRunning(_)));

        drop(guard);
        assert!(!controller.is_running());
        assert!(controller.try_start().is_ok());
    }

    #[test]
    fn test_start_clears_cancel() {
        let controller = RunController::new();
        controller.cancel();
        assert!(controller.is_canceled());

        let _guard = controller.start().unwrap();
        assert!(!controller.is_canceled());
        controller.cancel();
        assert!(controller.is_canceled());
    }
}

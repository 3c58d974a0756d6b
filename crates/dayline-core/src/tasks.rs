//! Detached background work.
//!
//! Cache persistence and high-water-mark writes never block the caller and
//! never change the outcome of the operation that triggered them. Failures are
//! logged and dropped.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinSet;

use crate::error::Result;

/// Set of fire-and-forget tasks that can be awaited on shutdown.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task`; an error is logged under `label`.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished tasks so the set does not grow without bound.
        while set.try_join_next().is_some() {}
        set.spawn(async move {
            if let Err(error) = task.await {
                tracing::warn!("Background {} failed: {}", label, error);
            }
        });
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every spawned task, including ones spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let mut drained = {
                let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *set)
            };
            if drained.is_empty() {
                return;
            }
            while let Some(result) = drained.join_next().await {
                if let Err(error) = result {
                    tracing::warn!("Background task panicked or was cancelled: {}", error);
                }
            }
        }
    }
}

//! Thread-safe graph handle and the pipeline write lease

use super::store::GraphStore;
use crate::error::{AnalyticsError, AnalyticsResult};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Cloneable handle to one graph shared between ingestion, pipeline runs and
/// readers
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<GraphStore>>,
}

impl SharedGraph {
    pub fn new(store: GraphStore) -> Self {
        SharedGraph {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Shared access for queries and snapshots
    pub fn read(&self) -> AnalyticsResult<RwLockReadGuard<'_, GraphStore>> {
        self.inner
            .read()
            .map_err(|_| AnalyticsError::GraphCorrupted("graph lock poisoned".to_string()))
    }

    /// Exclusive access for ingestion and stage commits
    pub fn write(&self) -> AnalyticsResult<RwLockWriteGuard<'_, GraphStore>> {
        self.inner
            .write()
            .map_err(|_| AnalyticsError::GraphCorrupted("graph lock poisoned".to_string()))
    }

    /// Acquire the write lease or fail with `PipelineBusy`
    pub fn try_lease(&self, holder: &str) -> AnalyticsResult<WriteLease> {
        let id = self.write()?.acquire_lease(holder)?;
        Ok(WriteLease {
            graph: self.clone(),
            id,
        })
    }

    /// Acquire the write lease, polling until `wait` elapses
    ///
    /// `None` means fail fast. Cancellation ends the wait early with
    /// `Cancelled`.
    pub fn lease(
        &self,
        holder: &str,
        wait: Option<Duration>,
        poll_interval: Duration,
        cancel: Option<&CancellationToken>,
    ) -> AnalyticsResult<WriteLease> {
        let deadline = wait.map(|w| Instant::now() + w);
        loop {
            match self.try_lease(holder) {
                Err(AnalyticsError::PipelineBusy(reason)) => {
                    let Some(deadline) = deadline else {
                        return Err(AnalyticsError::PipelineBusy(reason));
                    };
                    if Instant::now() >= deadline {
                        return Err(AnalyticsError::PipelineBusy(format!(
                            "{} (gave up after {:?})",
                            reason,
                            wait.unwrap_or_default()
                        )));
                    }
                    if cancel.map(CancellationToken::is_cancelled).unwrap_or(false) {
                        return Err(AnalyticsError::Cancelled(format!(
                            "{} while waiting for the write lease",
                            holder
                        )));
                    }
                    std::thread::sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now())));
                }
                other => return other,
            }
        }
    }
}

/// Exclusive right to commit stage outputs
///
/// While a lease is held, structural mutation and direct attribute writes
/// fail with `GraphLocked` and further lease requests with `PipelineBusy`.
/// Dropping the lease releases it.
#[derive(Debug)]
pub struct WriteLease {
    graph: SharedGraph,
    id: u64,
}

impl WriteLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }
}

impl Drop for WriteLease {
    fn drop(&mut self) {
        // Release even if a panicking writer poisoned the lock
        let mut store = match self.graph.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        store.release_lease(self.id);
    }
}

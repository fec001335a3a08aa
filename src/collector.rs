use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::metric::MetricRecord;

/// Shared "keep running" flag. Cheap to read from every worker's hot loop,
/// cleared at most meaningfully once per shutdown (clearing is idempotent).
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide sink for every worker's metric records.
///
/// Workers never touch the collector directly: the orchestrator harvests a
/// finished worker's records and funnels them in here, so there is a single
/// writer and no lock on the accumulation. Only the [`RunFlag`] is shared
/// across tasks.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    running: RunFlag,
    records: Vec<MetricRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the shared flag, for workers and shutdown wiring.
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }

    /// Stop the run. Safe to call from a signal handler task while workers
    /// are executing; calling it again is a no-op.
    pub fn stop(&self) {
        tracing::info!("shutting down");
        self.running.clear();
    }

    /// Append one harvested worker's batch. Insertion order is harvest order,
    /// within a batch it is the worker's own execution order.
    pub fn add_metrics(&mut self, batch: Vec<MetricRecord>) {
        self.records.extend(batch);
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }
}

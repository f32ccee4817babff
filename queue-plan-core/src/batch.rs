//! Multi-queue analysis.
//!
//! Each queue is analysed independently, so the batch fans out over a small
//! pool of scoped worker threads. Results are sorted by `(vhost, queue)`
//! afterwards, making output independent of scheduling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use serde::Serialize;
use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::plan::MigrationPlan;
use crate::queue::{QueueConfig, ValidationError};

/// Outcome of analysing one queue within a batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub vhost: String,
    pub queue_name: String,
    pub result: Result<MigrationPlan, ValidationError>,
}

/// Counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub analysed: usize,
    pub failed: usize,
    pub migratable: usize,
    pub blocked: usize,
    pub warnings: usize,
}

impl BatchSummary {
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut summary = BatchSummary::default();
        for entry in entries {
            match &entry.result {
                Ok(plan) => {
                    summary.analysed += 1;
                    summary.warnings += plan.warning_count();
                    if plan.is_blocked() {
                        summary.blocked += 1;
                    } else {
                        summary.migratable += 1;
                    }
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Analyse many queues on up to `workers` threads.
///
/// A validation failure is recorded for its queue only.
pub fn analyze_batch(
    configs: &[QueueConfig],
    analyzer: &Analyzer,
    workers: usize,
) -> Vec<BatchEntry> {
    if configs.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, configs.len());
    debug!(queues = configs.len(), workers, "analysing batch");

    let next = AtomicUsize::new(0);
    let results = Mutex::new(Vec::with_capacity(configs.len()));

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(config) = configs.get(index) else {
                    break;
                };
                let entry = analyse_one(config, analyzer);
                // A poisoned lock only means another worker panicked; the
                // collected entries are still valid.
                let mut guard = results.lock().unwrap_or_else(|e| e.into_inner());
                guard.push(entry);
            });
        }
    });

    let mut entries = results.into_inner().unwrap_or_else(|e| e.into_inner());
    entries.sort_by(|a, b| {
        a.vhost
            .cmp(&b.vhost)
            .then_with(|| a.queue_name.cmp(&b.queue_name))
    });
    entries
}

fn analyse_one(config: &QueueConfig, analyzer: &Analyzer) -> BatchEntry {
    let result = analyzer.plan(config);
    if let Err(err) = &result {
        warn!(queue = %config.name, vhost = %config.vhost, error = %err, "skipping queue");
    }
    BatchEntry {
        vhost: config.vhost.clone(),
        queue_name: config.name.clone(),
        result,
    }
}

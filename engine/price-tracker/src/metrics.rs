// Metrics collection for the polling engine

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters shared by the dispatcher and the workers
#[derive(Debug)]
pub struct EngineMetrics {
    // Dispatcher
    pub ticks_total: AtomicCounter,
    pub partial_ticks_total: AtomicCounter,
    pub tasks_dispatched_total: AtomicCounter,

    // Workers
    pub tasks_completed_total: AtomicCounter,
    pub fetch_failures_total: AtomicCounter,
    pub persist_failures_total: AtomicCounter,
    pub samples_stored_total: AtomicCounter,
    pub active_workers: AtomicGauge,

    // Registry
    pub tracked_coins: AtomicGauge,

    pub started_at: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            ticks_total: AtomicCounter::new(),
            partial_ticks_total: AtomicCounter::new(),
            tasks_dispatched_total: AtomicCounter::new(),
            tasks_completed_total: AtomicCounter::new(),
            fetch_failures_total: AtomicCounter::new(),
            persist_failures_total: AtomicCounter::new(),
            samples_stored_total: AtomicCounter::new(),
            active_workers: AtomicGauge::new(),
            tracked_coins: AtomicGauge::new(),
            started_at: Instant::now(),
        }
    }

    /// Tasks enqueued but not yet finished by a worker
    pub fn tasks_in_flight(&self) -> u64 {
        self.tasks_dispatched_total.get().saturating_sub(self.tasks_completed_total.get())
    }

    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            ticks_total: self.ticks_total.get(),
            partial_ticks_total: self.partial_ticks_total.get(),
            tasks_dispatched_total: self.tasks_dispatched_total.get(),
            tasks_completed_total: self.tasks_completed_total.get(),
            fetch_failures_total: self.fetch_failures_total.get(),
            persist_failures_total: self.persist_failures_total.get(),
            samples_stored_total: self.samples_stored_total.get(),
            active_workers: self.active_workers.get(),
            tracked_coins: self.tracked_coins.get(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe atomic counter
#[derive(Debug)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe atomic gauge
#[derive(Debug)]
pub struct AtomicGauge {
    value: AtomicU64,
}

impl AtomicGauge {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Default for AtomicGauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of [`EngineMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineMetricsSnapshot {
    pub ticks_total: u64,
    pub partial_ticks_total: u64,
    pub tasks_dispatched_total: u64,
    pub tasks_completed_total: u64,
    pub fetch_failures_total: u64,
    pub persist_failures_total: u64,
    pub samples_stored_total: u64,
    pub active_workers: u64,
    pub tracked_coins: u64,
    pub uptime_seconds: u64,
}

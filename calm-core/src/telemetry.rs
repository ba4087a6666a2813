//! Minimal telemetry primitives for the dispatcher (SPEC_FULL.md §4).
//!
//! Trimmed down from the teacher's `telemetry::counter`/`telemetry::gauge`
//! to the two primitives the dispatcher needs: a tool-call counter per
//! tool name and an active-session gauge. No histogram/summary machinery —
//! nothing here needs a duration distribution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Monotonically increasing counter (e.g. tool-call counts).
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Point-in-time value that can go up or down (e.g. active sessions).
#[derive(Debug)]
pub struct Gauge {
    value: Mutex<f64>,
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Gauge {
    #[must_use]
    pub fn new() -> Self {
        Self { value: Mutex::new(0.0) }
    }

    pub fn set(&self, value: f64) {
        *self.value.lock().unwrap() = value;
    }

    pub fn add(&self, delta: f64) {
        *self.value.lock().unwrap() += delta;
    }

    pub fn sub(&self, delta: f64) {
        self.add(-delta);
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        *self.value.lock().unwrap()
    }
}

//! Operation timing hooks.

use std::time::Duration;

use tracing::{debug, warn};

/// Receives the wall time of each cache operation.
pub trait PerformanceMonitor: Send {
    fn record(&self, operation: &'static str, elapsed: Duration);
}

/// Logs every operation at debug level and warns when one exceeds the budget.
#[derive(Debug, Clone, Copy)]
pub struct TracingMonitor {
    budget: Duration,
}

impl TracingMonitor {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl PerformanceMonitor for TracingMonitor {
    fn record(&self, operation: &'static str, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros() as u64;
        if elapsed > self.budget {
            warn!(
                operation,
                elapsed_us,
                budget_ms = self.budget.as_millis() as u64,
                "Cache operation over budget"
            );
        } else {
            debug!(operation, elapsed_us, "Cache operation");
        }
    }
}

/// Discards all measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl PerformanceMonitor for NoopMonitor {
    fn record(&self, _operation: &'static str, _elapsed: Duration) {}
}

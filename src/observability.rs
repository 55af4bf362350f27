//! Logging setup and expiry task counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = installed {
        // A subscriber is already set, e.g. by a test harness
        tracing::debug!(%err, "Tracing subscriber already installed");
    }
}

/// Counters for the background expiry task
#[derive(Debug, Default)]
pub struct Metrics {
    sweeps_completed: AtomicU64,
    sweeps_failed: AtomicU64,
    records_expired: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sweep_completed(&self, records_expired: usize) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        self.records_expired
            .fetch_add(records_expired as u64, Ordering::Relaxed);
        tracing::debug!(counter = "sweeps_completed", records_expired, "Metric incremented");
    }

    pub fn sweep_failed(&self) {
        self.sweeps_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "sweeps_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            sweeps_failed: self.sweeps_failed.load(Ordering::Relaxed),
            records_expired: self.records_expired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sweeps_completed: u64,
    pub sweeps_failed: u64,
    pub records_expired: u64,
}

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide counters for account and log activity.
#[derive(Clone)]
pub struct Metrics {
    pub signups: Arc<AtomicU64>,
    pub logins_succeeded: Arc<AtomicU64>,
    pub logins_failed: Arc<AtomicU64>,
    pub emails_sent: Arc<AtomicU64>,
    pub emails_failed: Arc<AtomicU64>,
    pub logs_written: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            signups: Arc::new(AtomicU64::new(0)),
            logins_succeeded: Arc::new(AtomicU64::new(0)),
            logins_failed: Arc::new(AtomicU64::new(0)),
            emails_sent: Arc::new(AtomicU64::new(0)),
            emails_failed: Arc::new(AtomicU64::new(0)),
            logs_written: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_signups(&self) {
        self.signups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_succeeded(&self) {
        self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_failed(&self) {
        self.logins_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_emails_sent(&self) {
        self.emails_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_emails_failed(&self) {
        self.emails_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_logs_written(&self, count: u64) {
        self.logs_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            signups: self.signups.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            emails_sent: self.emails_sent.load(Ordering::Relaxed),
            emails_failed: self.emails_failed.load(Ordering::Relaxed),
            logs_written: self.logs_written.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub signups: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub emails_sent: u64,
    pub emails_failed: u64,
    pub logs_written: u64,
    pub uptime_seconds: u64,
}

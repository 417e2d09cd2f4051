//! Relay statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Relay-wide counters, updated without locking
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    streams_opened: AtomicU64,
    streams_closed: AtomicU64,
    messages_published: AtomicU64,
    unknown_projects: AtomicU64,
    deliveries: AtomicU64,
    offline_skips: AtomicU64,
    dropped_deliveries: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            streams_opened: AtomicU64::new(0),
            streams_closed: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            unknown_projects: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            offline_skips: AtomicU64::new(0),
            dropped_deliveries: AtomicU64::new(0),
        }
    }

    pub fn stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_closed(&self) {
        self.streams_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one publish call and its per-subscriber results
    pub fn published(&self, delivered: usize, offline: usize, dropped: usize) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.offline_skips.fetch_add(offline as u64, Ordering::Relaxed);
        self.dropped_deliveries
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn unknown_project(&self) {
        self.unknown_projects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self, active_streams: usize) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_closed: self.streams_closed.load(Ordering::Relaxed),
            active_streams: active_streams as u64,
            messages_published: self.messages_published.load(Ordering::Relaxed),
            unknown_projects: self.unknown_projects.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            offline_skips: self.offline_skips.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub streams_opened: u64,
    pub streams_closed: u64,
    /// Registered users at snapshot time
    pub active_streams: u64,
    pub messages_published: u64,
    pub unknown_projects: u64,
    pub deliveries: u64,
    pub offline_skips: u64,
    pub dropped_deliveries: u64,
}

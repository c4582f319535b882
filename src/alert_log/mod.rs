//! AlertLog - Alert History (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Record High/Critical risk events in a bounded ring buffer
//! - Provide newest-first queries for the alerts endpoint
//!
//! In-memory only; history survives for the life of the process and the
//! oldest entries are evicted once capacity is reached.

use crate::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// One recorded alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    pub id: u64,
    pub at: DateTime<Utc>,
    pub severity: RiskLevel,
    pub score: u32,
    pub message: String,
    /// Labels of the detections that produced the alert
    pub labels: Vec<String>,
    /// Ingestion source: "camera", "push", "push-ws" or "upload"
    pub source: String,
}

impl AlertEntry {
    /// Build an entry; the log assigns the final id on append.
    pub fn new(
        severity: RiskLevel,
        score: u32,
        message: impl Into<String>,
        labels: Vec<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            at: Utc::now(),
            severity,
            score,
            message: message.into(),
            labels,
            source: source.into(),
        }
    }
}

/// Ring buffer for alerts
struct AlertRingBuffer {
    entries: VecDeque<AlertEntry>,
    capacity: usize,
    next_id: u64,
}

impl AlertRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, mut entry: AlertEntry) -> u64 {
        entry.id = self.next_id;
        self.next_id += 1;

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.next_id - 1
    }

    fn recent(&self, count: usize) -> Vec<AlertEntry> {
        self.entries.iter().rev().take(count).cloned().collect()
    }

    fn recent_by_source(&self, source: &str, count: usize) -> Vec<AlertEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.source == source)
            .take(count)
            .cloned()
            .collect()
    }
}

/// AlertLog instance
pub struct AlertLog {
    buffer: RwLock<AlertRingBuffer>,
}

impl AlertLog {
    /// Create new AlertLog
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(AlertRingBuffer::new(capacity)),
        }
    }

    /// Record an alert, returning its assigned id
    pub async fn append(&self, entry: AlertEntry) -> u64 {
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(entry);
        tracing::debug!(alert_id = id, "Alert recorded");
        id
    }

    /// Latest alerts, newest first
    pub async fn recent(&self, count: usize) -> Vec<AlertEntry> {
        let buffer = self.buffer.read().await;
        buffer.recent(count)
    }

    /// Latest alerts from one ingestion source, newest first
    pub async fn recent_by_source(&self, source: &str, count: usize) -> Vec<AlertEntry> {
        let buffer = self.buffer.read().await;
        buffer.recent_by_source(source, count)
    }

    /// Number of retained alerts
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.entries.len()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(500)
    }
}

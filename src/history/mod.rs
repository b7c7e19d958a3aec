//! # Health History
//!
//! Bounded per-component history of evaluations. Each component key owns a FIFO ring buffer
//! behind its own mutex, so concurrent evaluations of the same component serialize while
//! different components never contend. Analysis always runs on a cloned snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::constants::system;
use crate::error::{HealthError, Result};
use crate::integration::HistoryQuery;
use crate::models::{HistoryEntry, HistoryPoint};

/// Fixed-capacity FIFO of history entries, oldest first
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, returning the evicted oldest entry when the buffer was full
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Selection window for history queries
///
/// Parses `"30s"`, `"15m"`, `"2h"`, `"1d"` (entries newer than now minus the span) and
/// `"last:N"` (the newest N entries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSpec {
    Since(Duration),
    Last(usize),
}

impl IntervalSpec {
    /// Filter `entries` (oldest first) relative to `now`
    pub fn select<'a>(
        &self,
        entries: &'a [HistoryEntry],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        let (skip, cutoff) = match *self {
            IntervalSpec::Last(n) => (entries.len().saturating_sub(n), None),
            IntervalSpec::Since(span) => (0, Some(now - span)),
        };
        entries
            .iter()
            .skip(skip)
            .filter(move |e| cutoff.map_or(true, |c| e.timestamp >= c))
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSpec::Last(n) => write!(f, "last:{n}"),
            IntervalSpec::Since(span) => write!(f, "{}s", span.num_seconds()),
        }
    }
}

impl FromStr for IntervalSpec {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let invalid = || HealthError::HistoryError(format!("Invalid interval spec: '{s}'"));

        if let Some(count) = raw.strip_prefix("last:") {
            let n = count.trim().parse::<usize>().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            return Ok(IntervalSpec::Last(n));
        }

        if raw.len() < 2 || !raw.is_ascii() {
            return Err(invalid());
        }
        let (amount, unit) = raw.split_at(raw.len() - 1);
        let amount = amount.parse::<i64>().map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }
        let span = match unit {
            "s" => Duration::seconds(amount),
            "m" => Duration::minutes(amount),
            "h" => Duration::hours(amount),
            "d" => Duration::days(amount),
            _ => return Err(invalid()),
        };
        Ok(IntervalSpec::Since(span))
    }
}

/// Per-key history registry shared by evaluators and samplers
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    buffers: DashMap<String, Arc<Mutex<HistoryBuffer>>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(system::DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn buffer(&self, key: &str) -> Arc<Mutex<HistoryBuffer>> {
        // Clone the Arc so the DashMap shard lock is released before the buffer lock is taken
        self.buffers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HistoryBuffer::new(self.capacity))))
            .value()
            .clone()
    }

    /// Run `f` with exclusive access to the buffer for `key`
    ///
    /// This is the single-writer section: read the snapshot, decide, and push all happen
    /// while the key's lock is held.
    pub fn update<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut HistoryBuffer) -> R,
    {
        let buffer = self.buffer(key);
        let mut guard = buffer.lock();
        f(&mut guard)
    }

    pub fn record(&self, key: &str, entry: HistoryEntry) {
        let evicted = self.update(key, |buffer| buffer.push(entry));
        if evicted.is_some() {
            debug!(key = %key, capacity = self.capacity, "History buffer full, evicted oldest entry");
        }
    }

    /// Consistent copy of the history for `key`, oldest first
    pub fn snapshot(&self, key: &str) -> Vec<HistoryEntry> {
        match self.buffers.get(key).map(|b| b.value().clone()) {
            Some(buffer) => buffer.lock().snapshot(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, key: &str) -> usize {
        match self.buffers.get(key).map(|b| b.value().clone()) {
            Some(buffer) => buffer.lock().len(),
            None => 0,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.buffers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn clear(&self, key: &str) {
        self.buffers.remove(key);
    }

    pub fn query(&self, key: &str, interval: IntervalSpec, now: DateTime<Utc>) -> Vec<HistoryPoint> {
        let entries = self.snapshot(key);
        interval
            .select(&entries, now)
            .map(HistoryEntry::point)
            .collect()
    }
}

#[async_trait]
impl HistoryQuery for HistoryStore {
    async fn get_history(&self, component: &str, interval: IntervalSpec) -> Result<Vec<HistoryPoint>> {
        Ok(self.query(component, interval, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HealthStatus;

    fn entry_at(minutes_ago: i64, score: f64, now: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry::raw(now - Duration::minutes(minutes_ago), score, HealthStatus::Healthy)
    }

    #[test]
    fn test_buffer_evicts_oldest_first() {
        let now = Utc::now();
        let mut buffer = HistoryBuffer::new(20);
        for i in 0..25 {
            buffer.push(entry_at(0, i as f64, now));
        }
        assert_eq!(buffer.len(), 20);
        let scores: Vec<f64> = buffer.iter().map(|e| e.health_score).collect();
        assert_eq!(scores.first(), Some(&5.0));
        assert_eq!(scores.last(), Some(&24.0));
    }

    #[test]
    fn test_buffer_zero_capacity_is_bumped() {
        assert_eq!(HistoryBuffer::new(0).capacity(), 1);
    }

    #[test]
    fn test_interval_spec_parsing() {
        assert_eq!(
            "30s".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Since(Duration::seconds(30))
        );
        assert_eq!(
            "15m".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Since(Duration::minutes(15))
        );
        assert_eq!(
            "2h".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Since(Duration::hours(2))
        );
        assert_eq!(
            "1d".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Since(Duration::days(1))
        );
        assert_eq!("last:5".parse::<IntervalSpec>().unwrap(), IntervalSpec::Last(5));

        for bad in ["", "m", "10x", "-5m", "0s", "last:0", "last:abc", "5µ"] {
            assert!(bad.parse::<IntervalSpec>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_store_query_by_window_and_count() {
        let now = Utc::now();
        let store = HistoryStore::new(20);
        for (ago, score) in [(30, 70.0), (10, 80.0), (5, 85.0), (1, 90.0)] {
            store.record("overall", entry_at(ago, score, now));
        }

        let recent = store.query("overall", "15m".parse().unwrap(), now);
        let values: Vec<f64> = recent.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![80.0, 85.0, 90.0]);

        let last_two = store.query("overall", IntervalSpec::Last(2), now);
        let values: Vec<f64> = last_two.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![85.0, 90.0]);

        assert!(store.query("missing", IntervalSpec::Last(2), now).is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let now = Utc::now();
        let store = HistoryStore::new(3);
        store.record("overall", entry_at(0, 1.0, now));
        store.record("layer:storage", entry_at(0, 2.0, now));

        assert_eq!(store.len("overall"), 1);
        assert_eq!(store.len("layer:storage"), 1);
        assert_eq!(store.keys(), vec!["layer:storage".to_string(), "overall".to_string()]);

        store.clear("overall");
        assert_eq!(store.len("overall"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers_respect_capacity() {
        let store = Arc::new(HistoryStore::new(20));
        let mut handles = Vec::new();
        for task in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    store.record("overall", HistoryEntry::raw(Utc::now(), (task * 10 + i) as f64, HealthStatus::Healthy));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len("overall"), 20);
    }

    #[tokio::test]
    async fn test_history_query_trait() {
        let store = HistoryStore::default();
        store.record("overall", HistoryEntry::raw(Utc::now(), 88.0, HealthStatus::Healthy));
        let points = store.get_history("overall", IntervalSpec::Last(10)).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 88.0);
    }
}

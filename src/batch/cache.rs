//! In-memory response cache
//!
//! Completed outputs keyed by request key, bounded by TTL and entry count.
//! Lock-free concurrent access via DashMap so concurrent jobs never block
//! each other.

use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CachePolicy;

#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, (Instant, Value)>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(policy: &CachePolicy) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(policy.ttl_hours * 3600),
            max_entries: policy.max_entries,
            enabled: policy.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        {
            let entry = self.entries.get(key)?;
            if entry.0.elapsed() < self.ttl {
                return Some(entry.1.clone());
            }
        }
        // expired; the read guard is released above
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: &str, value: Value) {
        if !self.enabled || self.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict_oldest();
        }
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().0)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

//! Per-server histogram of observed HTTP status codes.

use std::collections::{BTreeMap, HashMap};

use dashmap::DashMap;

/// Point-in-time copy: server URL → status code → count.
pub type CodeSnapshot = BTreeMap<String, BTreeMap<u16, u64>>;

/// Thread-safe status code counter.
///
/// Each server's inner map is guarded by its own shard lock, so updates never
/// get lost and a snapshot copies every server's counts coherently. Different
/// servers may be copied at slightly different moments.
#[derive(Debug, Default)]
pub struct CodeCounter {
    codes: DashMap<String, HashMap<u16, u64>>,
}

impl CodeCounter {
    /// Create a counter with an empty histogram for each server.
    pub fn new<'a>(servers: impl IntoIterator<Item = &'a str>) -> Self {
        let codes = DashMap::new();
        for server in servers {
            codes.insert(server.to_string(), HashMap::new());
        }
        Self { codes }
    }

    /// Increment the count of `code` for `server`.
    pub fn count(&self, server: &str, code: u16) {
        if let Some(mut codes) = self.codes.get_mut(server) {
            *codes.entry(code).or_insert(0) += 1;
            return;
        }
        *self
            .codes
            .entry(server.to_string())
            .or_default()
            .entry(code)
            .or_insert(0) += 1;
    }

    /// Copy the current counts.
    pub fn snapshot(&self) -> CodeSnapshot {
        self.codes
            .iter()
            .map(|entry| {
                let codes = entry.value().iter().map(|(&c, &n)| (c, n)).collect();
                (entry.key().clone(), codes)
            })
            .collect()
    }
}

//! Persisted set of requests the executor is watching.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use deferral_core::{Request, RequestId, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the executor needs to know about a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRequest {
    pub id: RequestId,
    pub max_cost: u64,
    pub deadline: DateTime<Utc>,
}

impl From<&Request> for TrackedRequest {
    fn from(request: &Request) -> Self {
        Self {
            id: request.id,
            max_cost: request.max_cost,
            deadline: request.deadline,
        }
    }
}

/// Tracked requests, written to disk after every change.
#[derive(Debug)]
pub struct RequestTracker {
    path: PathBuf,
    requests: BTreeMap<RequestId, TrackedRequest>,
}

impl RequestTracker {
    /// Load from `path`. A missing file yields an empty tracker.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let requests = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            BTreeMap::new()
        };

        info!("Loaded {} tracked requests from {}", requests.len(), path.display());
        Ok(Self { path, requests })
    }

    /// Write to a sibling temp file, then rename over the state file.
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.requests)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!("Saved {} tracked requests", self.requests.len());
        Ok(())
    }

    /// Start tracking. Returns false if the request was already tracked.
    pub fn track(&mut self, request: TrackedRequest) -> Result<bool> {
        if self.requests.get(&request.id) == Some(&request) {
            return Ok(false);
        }
        let fresh = self.requests.insert(request.id, request).is_none();
        self.save()?;
        Ok(fresh)
    }

    /// Stop tracking. Returns false if the request was not tracked.
    pub fn untrack(&mut self, id: &RequestId) -> Result<bool> {
        if self.requests.remove(id).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.requests.contains_key(id)
    }

    /// Snapshot of tracked requests, earliest id first.
    pub fn snapshot(&self) -> Vec<TrackedRequest> {
        self.requests.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

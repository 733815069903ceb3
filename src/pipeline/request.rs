//! Request identifiers for discarding superseded results.
//!
//! Inference runs to completion once started. A caller that fires a new
//! request before the previous one returns checks
//! [`RequestTracker::is_latest`] and drops the older result.

use crate::inference::ModelKind;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id of one pipeline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues ids and remembers the newest one per model.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next: AtomicU64,
    latest_classification: AtomicU64,
    latest_detection: AtomicU64,
}

impl RequestTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn latest(&self, kind: ModelKind) -> &AtomicU64 {
        match kind {
            ModelKind::Classification => &self.latest_classification,
            ModelKind::Detection => &self.latest_detection,
        }
    }

    /// Start a request for `kind`, superseding earlier ones.
    pub fn begin(&self, kind: ModelKind) -> RequestId {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest(kind).fetch_max(id, Ordering::AcqRel);
        RequestId(id)
    }

    /// True if no newer request for `kind` has started since `id`.
    pub fn is_latest(&self, kind: ModelKind, id: RequestId) -> bool {
        self.latest(kind).load(Ordering::Acquire) == id.0
    }
}

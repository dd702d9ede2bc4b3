use serde::{Deserialize, Serialize};

/// Per-state job counts for a queue.
///
/// Produced from a single consistent read, so the per-state counts always sum
/// to `total_count` even while producers and consumers are mutating the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting on a future activation time.
    pub delayed_count: u64,
    /// Jobs eligible for retrieval.
    pub inactive_count: u64,
    /// Jobs claimed by consumers.
    pub active_count: u64,
    /// All jobs known to the queue.
    pub total_count: u64,
}

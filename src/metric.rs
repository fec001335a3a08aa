use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single observed sample: one task execution in one state.
///
/// Exactly one of `status` and `error` is populated: `status` when the
/// request completed, `error` when the transport failed. `elapsed` covers the
/// full round trip either way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub state: String,
    pub task: String,
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl MetricRecord {
    /// Whether the request completed, regardless of its status code.
    pub fn completed(&self) -> bool {
        self.status.is_some()
    }
}

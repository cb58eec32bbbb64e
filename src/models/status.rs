use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Status of one image request, as reported on the wire by the compute tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageRequestStatus {
    Started,
    Partial,
    InProgress,
    Success,
    Failed,
}

/// Per-item ledger entry for one submitted image request.
///
/// Created by the dispatcher at `Started`/`completed = false`; only the
/// tracker transitions it afterwards. Records are never removed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub image_url: String,
    pub job_id: String,
    /// Identifier returned by the request channel; absent when the publish
    /// itself failed.
    pub message_id: Option<String>,
    pub status: ImageRequestStatus,
    pub completed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// The run's ledger: one record per submitted image, keyed by source URI.
/// Insertion order is submission order.
pub type StatusMap = IndexMap<String, JobStatusRecord>;

/// True once every record in the ledger has been marked completed.
pub fn all_completed(status: &StatusMap) -> bool {
    !status.is_empty() && status.values().all(|r| r.completed)
}

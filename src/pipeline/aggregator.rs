//! Merges per-item result artifacts into the job's canonical "total"
//! collection.

use std::path::{Path, PathBuf};

use crate::models::feature::FeatureCollection;
use crate::pipeline::{list_result_artifacts, PipelineError};
use crate::services::storage::ObjectStore;

const PROGRESS_LOG_EVERY: usize = 100;

/// Outcome of one aggregation pass.
#[derive(Debug)]
pub struct MergeSummary {
    pub collection: FeatureCollection,
    pub artifacts_read: usize,
    /// Artifacts that could not be fetched or parsed; partial aggregation is
    /// preferable to total failure.
    pub skipped: usize,
    /// Result-store URI of the persisted aggregate.
    pub total_uri: String,
    pub local_path: Option<PathBuf>,
}

/// Key of the canonical aggregate artifact for a job.
pub fn total_key(job_prefix: &str, job_name: &str) -> String {
    format!("{job_prefix}/{job_name}-total.geojson")
}

/// Merge every per-item artifact under the job prefix into one collection
/// and persist it as the `-total` aggregate, overwriting any previous one.
///
/// The listing excludes `-total` artifacts, so the merge never reads its own
/// previous output: re-running over an unchanged artifact set reproduces the
/// same feature multiset.
pub async fn merge(
    store: &dyn ObjectStore,
    job_prefix: &str,
    job_name: &str,
    local_dir: Option<&Path>,
) -> Result<MergeSummary, PipelineError> {
    let artifacts = list_result_artifacts(store, job_prefix).await?;
    tracing::info!(
        prefix = job_prefix,
        artifacts = artifacts.len(),
        "merging result artifacts"
    );

    let mut merged = FeatureCollection::empty();
    let mut artifacts_read = 0usize;
    let mut skipped = 0usize;

    for (index, key) in artifacts.iter().enumerate() {
        if (index + 1) % PROGRESS_LOG_EVERY == 0 {
            tracing::info!(processed = index + 1, total = artifacts.len(), "merge progress");
        }

        let bytes = match store.get(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "artifact unreadable, skipping");
                skipped += 1;
                continue;
            }
        };

        let collection: FeatureCollection = match serde_json::from_slice(&bytes) {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "artifact unparseable, skipping");
                skipped += 1;
                continue;
            }
        };

        if merged.crs.is_none() {
            merged.crs = collection.crs.clone();
        }
        merged.features.extend(collection.features);
        artifacts_read += 1;
    }

    tracing::info!(
        artifacts_read,
        skipped,
        features = merged.len(),
        "aggregation complete"
    );

    let key = total_key(job_prefix, job_name);
    let payload = serde_json::to_vec(&merged)?;
    store.put(&key, &payload, "application/geo+json").await?;
    let total_uri = store.uri(&key);
    tracing::info!(uri = %total_uri, "aggregate artifact written");

    let local_path = match local_dir {
        Some(dir) => Some(write_local_copy(dir, job_name, &payload).await?),
        None => None,
    };

    Ok(MergeSummary {
        collection: merged,
        artifacts_read,
        skipped,
        total_uri,
        local_path,
    })
}

async fn write_local_copy(
    dir: &Path,
    job_name: &str,
    payload: &[u8],
) -> Result<PathBuf, PipelineError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{job_name}-total.geojson"));
    tokio::fs::write(&path, payload).await?;
    tracing::info!(path = %path.display(), "aggregate cached locally");
    Ok(path)
}

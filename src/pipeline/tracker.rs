//! Observes job progress through the result store.
//!
//! The compute tier offers no per-item callback; the only completion signal
//! is a result artifact appearing under the job's output prefix. Completion
//! is therefore inferred structurally, artifact count against expected
//! count. The heuristic under-counts an item that fails without ever writing
//! an artifact; such a run ends by timeout, not by detection. Kept this way
//! deliberately for compatibility with the compute tier's contract.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::item::image_basename;
use crate::models::status::{ImageRequestStatus, StatusMap};
use crate::pipeline::{list_result_artifacts, PipelineError};
use crate::services::storage::ObjectStore;

/// Terminal report of a tracking wait. `completed = false` is a defined
/// outcome (timeout or cancellation), not an error.
#[derive(Debug)]
pub struct CompletionReport {
    pub completed: bool,
    pub result_uris: Vec<String>,
}

/// One poll's worth of progress, for interactive use.
#[derive(Debug)]
pub struct Progress {
    pub observed: usize,
    pub expected: usize,
    pub result_uris: Vec<String>,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.observed > 0 && self.observed >= self.expected
    }
}

/// Single non-blocking poll: list result artifacts, update the ledger, and
/// report counts.
pub async fn check_progress(
    store: &dyn ObjectStore,
    job_prefix: &str,
    status: &mut StatusMap,
) -> Result<Progress, PipelineError> {
    let artifacts = list_result_artifacts(store, job_prefix).await?;
    correlate(store, &artifacts, status);

    let progress = Progress {
        observed: artifacts.len(),
        expected: status.len(),
        result_uris: artifacts.iter().map(|key| store.uri(key)).collect(),
    };

    tracing::info!(
        observed = progress.observed,
        expected = progress.expected,
        "job progress"
    );
    Ok(progress)
}

/// Poll the result store until every expected artifact is present, the
/// timeout elapses, or the caller cancels. Timeout and cancellation return
/// the partial set observed so far with `completed = false`.
pub async fn await_completion(
    store: &dyn ObjectStore,
    job_prefix: &str,
    status: &mut StatusMap,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<CompletionReport, PipelineError> {
    let start = Instant::now();
    let mut last_uris = Vec::new();

    tracing::info!(
        prefix = job_prefix,
        poll_secs = poll_interval.as_secs(),
        timeout_secs = timeout.as_secs(),
        "monitoring job progress"
    );

    loop {
        match check_progress(store, job_prefix, status).await {
            Ok(progress) => {
                last_uris = progress.result_uris.clone();
                if progress.is_complete() {
                    tracing::info!("job complete, all result artifacts observed");
                    return Ok(CompletionReport {
                        completed: true,
                        result_uris: progress.result_uris,
                    });
                }
            }
            // A failed listing is transient; keep the previous observation
            // and try again next poll.
            Err(PipelineError::Storage(e)) => {
                tracing::warn!(error = %e, "result store listing failed, will retry");
            }
            Err(e) => return Err(e),
        }

        if start.elapsed() > timeout {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                observed = last_uris.len(),
                expected = status.len(),
                "timed out waiting for job completion"
            );
            return Ok(CompletionReport {
                completed: false,
                result_uris: last_uris,
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!("tracking cancelled by caller");
                return Ok(CompletionReport {
                    completed: false,
                    result_uris: last_uris,
                });
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Mark the ledger record of every observed artifact as succeeded.
/// Artifacts correlate to items through the shared image basename.
fn correlate(store: &dyn ObjectStore, artifacts: &[String], status: &mut StatusMap) {
    for key in artifacts {
        let artifact_base = image_basename(key);
        for record in status.values_mut() {
            if record.completed || image_basename(&record.image_url) != artifact_base {
                continue;
            }
            record.status = ImageRequestStatus::Success;
            record.completed = true;
            tracing::debug!(
                image = %record.image_url,
                artifact = %store.uri(key),
                "result artifact observed"
            );
        }
    }
}

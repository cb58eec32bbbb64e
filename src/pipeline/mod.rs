//! The dispatch → track → aggregate → filter pipeline.
//!
//! Work items are fanned out to the compute tier through the request channel;
//! completion is observed indirectly through result artifacts appearing in
//! the result store, then partial outputs are merged exactly once and
//! threshold-filtered.

pub mod aggregator;
pub mod dispatcher;
pub mod filter;
pub mod geometry;
pub mod resolver;
pub mod tracker;

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::context::RunContext;
use crate::models::item::WorkItem;
use crate::models::request::RequestBuildError;
use crate::services::queue::QueueError;
use crate::services::storage::{ObjectStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    RequestBuild(#[from] RequestBuildError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a full pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub resolved: usize,
    pub submitted: usize,
    pub publish_errors: usize,
    /// False when the tracker timed out or was cancelled with items missing.
    pub completed: bool,
    pub merged_features: usize,
    pub kept: usize,
    pub dropped: usize,
    pub export_path: Option<PathBuf>,
}

/// Run the whole pipeline: resolve → dispatch → track → aggregate → filter →
/// export. An empty input set short-circuits after resolution. A tracker
/// timeout does not abort the run; whatever artifacts exist are aggregated
/// and the report carries `completed = false`.
pub async fn run(ctx: &RunContext, cancel: &CancellationToken) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::default();

    let uris = resolver::resolve(ctx).await?;
    report.resolved = uris.len();
    if uris.is_empty() {
        tracing::info!("no input images resolved, nothing to do");
        return Ok(report);
    }

    let items: Vec<WorkItem> = uris.iter().map(WorkItem::from_uri).collect();

    let outcome = dispatcher::submit(ctx, &items).await;
    report.submitted = outcome.status.len();
    report.publish_errors = outcome.publish_errors;
    let mut status = outcome.status;

    let completion = tracker::await_completion(
        ctx.results.as_ref(),
        &ctx.config.job_prefix(),
        &mut status,
        Duration::from_secs(ctx.config.poll_interval_secs),
        Duration::from_secs(ctx.config.timeout_mins * 60),
        cancel,
    )
    .await?;
    report.completed = completion.completed;
    if !completion.completed {
        tracing::warn!(
            observed = completion.result_uris.len(),
            expected = status.len(),
            "job did not complete in time, aggregating partial results"
        );
    }

    let summary = aggregator::merge(
        ctx.results.as_ref(),
        &ctx.config.job_prefix(),
        &ctx.config.job_name,
        ctx.config.results_dir.as_deref().map(std::path::Path::new),
    )
    .await?;
    report.merged_features = summary.collection.len();

    let (filtered, dropped) =
        filter::filter_collection(&summary.collection, ctx.config.confidence_threshold);
    report.kept = filtered.len();
    report.dropped = dropped;

    if let Some(dir) = ctx.config.results_dir.as_deref() {
        let path = filter::export(
            &filtered,
            &ctx.config.job_name,
            ctx.config.confidence_threshold,
            std::path::Path::new(dir),
        )
        .await?;
        report.export_path = Some(path);
    }

    Ok(report)
}

/// Per-item result artifacts for a job: `.geojson` keys under the job
/// prefix, excluding the aggregate `-total` artifact so the pipeline never
/// counts or re-reads its own merged output.
pub(crate) async fn list_result_artifacts(
    store: &dyn ObjectStore,
    job_prefix: &str,
) -> Result<Vec<String>, StorageError> {
    let keys = store.list(job_prefix).await?;
    Ok(keys
        .into_iter()
        .filter(|key| key.ends_with(".geojson") && !key.contains("-total"))
        .collect())
}

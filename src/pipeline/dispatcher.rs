//! Fans work items out to the compute tier, one request message each.

use chrono::Utc;
use uuid::Uuid;

use crate::context::RunContext;
use crate::models::item::WorkItem;
use crate::models::request::{ImageRequest, RequestBuildError};
use crate::models::status::{ImageRequestStatus, JobStatusRecord, StatusMap};

/// Result of submitting a batch: the run's status ledger plus how many
/// publishes failed. Failures never abort the remaining items.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub status: StatusMap,
    pub publish_errors: usize,
}

/// Submit every work item: build a validated request, publish it exactly
/// once, and record it in the ledger at `Started`/`completed = false`.
///
/// Job ids are `<item id>-<run salt>`: stable per item within a run, unique
/// across runs, so a retried submission is distinguishable downstream.
pub async fn submit(ctx: &RunContext, items: &[WorkItem]) -> SubmitOutcome {
    let run_salt: String = Uuid::new_v4().to_string().chars().take(12).collect();
    let mut status = StatusMap::with_capacity(items.len());
    let mut publish_errors = 0usize;

    for item in items {
        let job_id = format!("{}-{}", item.id, run_salt);

        let request = match build_request(ctx, item, &job_id) {
            Ok(request) => request,
            Err(e) => {
                // Incomplete configuration is caught here, before anything
                // reaches the wire.
                tracing::error!(image = %item.source_uri, error = %e, "invalid image request");
                status.insert(item.source_uri.clone(), failed_record(item, &job_id));
                publish_errors += 1;
                continue;
            }
        };

        match ctx.channel.publish(&request).await {
            Ok(message_id) => {
                tracing::info!(
                    image = %item.source_uri,
                    job_id = %job_id,
                    message_id = %message_id,
                    "image request published"
                );
                status.insert(
                    item.source_uri.clone(),
                    JobStatusRecord {
                        image_url: item.source_uri.clone(),
                        job_id,
                        message_id: Some(message_id),
                        status: ImageRequestStatus::Started,
                        completed: false,
                        submitted_at: Utc::now(),
                    },
                );
            }
            Err(e) => {
                tracing::warn!(
                    image = %item.source_uri,
                    job_id = %job_id,
                    error = %e,
                    "publish failed, continuing with remaining items"
                );
                status.insert(item.source_uri.clone(), failed_record(item, &job_id));
                publish_errors += 1;
            }
        }
    }

    tracing::info!(
        submitted = status.len(),
        errors = publish_errors,
        "batch submission finished"
    );

    SubmitOutcome {
        status,
        publish_errors,
    }
}

fn build_request(
    ctx: &RunContext,
    item: &WorkItem,
    job_id: &str,
) -> Result<ImageRequest, RequestBuildError> {
    let config = &ctx.config;
    ImageRequest::builder()
        .job_id(job_id)
        .job_name(&config.job_name)
        .region(&config.region)
        .account(&config.account)
        .image_url(&item.source_uri)
        .output(&config.output_bucket, config.job_prefix())
        .endpoint_name(&config.model_endpoint_name)
        .tile_size(config.tile_size)
        .tile_overlap(config.tile_overlap)
        .tile_format(&config.tile_format)
        .tile_compression(&config.tile_compression)
        .build()
}

fn failed_record(item: &WorkItem, job_id: &str) -> JobStatusRecord {
    JobStatusRecord {
        image_url: item.source_uri.clone(),
        job_id: job_id.to_string(),
        message_id: None,
        status: ImageRequestStatus::Failed,
        completed: false,
        submitted_at: Utc::now(),
    }
}

mod config;
mod context;
mod models;
mod pipeline;
mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::PipelineConfig;
use context::RunContext;
use models::feature::FeatureCollection;
use models::status::{ImageRequestStatus, JobStatusRecord, StatusMap};
use pipeline::{aggregator, filter, resolver, tracker};
use services::endpoint::EndpointControlClient;
use services::queue::RedisRequestChannel;
use services::storage::{ObjectStore, S3ObjectStore};

const ENDPOINT_CHECK_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = PipelineConfig::from_env().expect("Failed to load configuration from environment");

    let command = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    tracing::info!(command = %command, job = %config.job_name, "starting imagery-batch");

    let imagery: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::new(&imagery_bucket(&config), &config.region)
            .expect("Failed to initialize imagery store"),
    );
    let results: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::new(&config.output_bucket, &config.region)
            .expect("Failed to initialize result store"),
    );
    let channel = Arc::new(
        RedisRequestChannel::new(&config.redis_url, &config.request_queue_key)
            .expect("Failed to initialize request channel"),
    );

    let ctx = RunContext::new(config.clone(), imagery, results, channel.clone());

    let outcome = match command.as_str() {
        "run" => run_pipeline(&ctx, channel.as_ref()).await,
        "progress" => show_progress(&ctx).await,
        "merge" => merge_results(&ctx).await,
        "filter" => filter_results(&ctx, std::env::args().nth(2)).await,
        "endpoint-up" => endpoint_up(&ctx.config).await,
        "endpoint-down" => endpoint_down(&ctx.config).await,
        other => {
            tracing::error!(command = other, "unknown command");
            tracing::info!("commands: run | progress | merge | filter [threshold] | endpoint-up | endpoint-down");
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

async fn run_pipeline(
    ctx: &RunContext,
    channel: &RedisRequestChannel,
) -> Result<(), Box<dyn std::error::Error>> {
    channel.health_check().await?;
    tracing::info!("request channel reachable");

    if ctx.config.endpoint_control_url.is_some() {
        endpoint_up(&ctx.config).await?;
    }

    // Ctrl-C cancels the tracking wait and falls through to partial
    // aggregation.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling tracking wait");
            signal_cancel.cancel();
        }
    });

    let report = pipeline::run(ctx, &cancel).await?;
    tracing::info!(
        resolved = report.resolved,
        submitted = report.submitted,
        publish_errors = report.publish_errors,
        completed = report.completed,
        merged_features = report.merged_features,
        kept = report.kept,
        dropped = report.dropped,
        export = %report
            .export_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        "pipeline run finished"
    );
    Ok(())
}

async fn show_progress(ctx: &RunContext) -> Result<(), Box<dyn std::error::Error>> {
    let uris = resolver::resolve(ctx).await?;
    let mut status: StatusMap = uris
        .iter()
        .map(|uri| {
            (
                uri.clone(),
                JobStatusRecord {
                    image_url: uri.clone(),
                    job_id: String::new(),
                    message_id: None,
                    status: ImageRequestStatus::InProgress,
                    completed: false,
                    submitted_at: Utc::now(),
                },
            )
        })
        .collect();

    let progress = tracker::check_progress(
        ctx.results.as_ref(),
        &ctx.config.job_prefix(),
        &mut status,
    )
    .await?;

    if progress.is_complete() {
        tracing::info!("job complete, ready for aggregation and post-processing");
    }
    Ok(())
}

async fn merge_results(ctx: &RunContext) -> Result<(), Box<dyn std::error::Error>> {
    let summary = aggregator::merge(
        ctx.results.as_ref(),
        &ctx.config.job_prefix(),
        &ctx.config.job_name,
        ctx.config.results_dir.as_deref().map(Path::new),
    )
    .await?;
    tracing::info!(
        features = summary.collection.len(),
        skipped = summary.skipped,
        uri = %summary.total_uri,
        "merge finished"
    );
    Ok(())
}

async fn filter_results(
    ctx: &RunContext,
    threshold_arg: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let threshold = match threshold_arg {
        Some(raw) => raw.parse::<f64>()?,
        None => ctx.config.confidence_threshold,
    };

    let key = aggregator::total_key(&ctx.config.job_prefix(), &ctx.config.job_name);
    let bytes = ctx.results.get(&key).await?;
    let collection: FeatureCollection = serde_json::from_slice(&bytes)?;

    let (filtered, dropped) = filter::filter_collection(&collection, threshold);
    tracing::info!(kept = filtered.len(), dropped, "filter finished");

    let dir = ctx.config.results_dir.clone().unwrap_or_else(|| ".".to_string());
    let path = filter::export(&filtered, &ctx.config.job_name, threshold, Path::new(&dir)).await?;
    tracing::info!(path = %path.display(), "export written");
    Ok(())
}

async fn endpoint_up(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = config
        .endpoint_control_url
        .as_deref()
        .ok_or("endpoint_control_url is not configured")?;
    let config_name = config
        .model_endpoint_config_name
        .as_deref()
        .ok_or("model_endpoint_config_name is not configured")?;

    let client = EndpointControlClient::new(base_url);
    client.create(&config.model_endpoint_name, config_name).await?;

    let ready = client
        .wait_until_ready(
            &config.model_endpoint_name,
            Duration::from_secs(ENDPOINT_CHECK_INTERVAL_SECS),
            Duration::from_secs(config.timeout_mins * 60),
        )
        .await?;
    if !ready {
        return Err("endpoint did not become ready".into());
    }
    Ok(())
}

async fn endpoint_down(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = config
        .endpoint_control_url
        .as_deref()
        .ok_or("endpoint_control_url is not configured")?;
    let client = EndpointControlClient::new(base_url);
    client.delete(&config.model_endpoint_name).await?;
    Ok(())
}

/// Bucket the resolver reads from: explicit imagery bucket, else the bucket
/// of the configured s3_path, else the output bucket (single-file runs never
/// list it).
fn imagery_bucket(config: &PipelineConfig) -> String {
    if let Some(bucket) = &config.imagery_bucket {
        return bucket.clone();
    }
    if let Some(path) = &config.s3_path {
        if let Ok((bucket, _)) = resolver::parse_s3_uri(path) {
            return bucket;
        }
    }
    config.output_bucket.clone()
}

mod helpers;

use std::sync::Arc;

use imagery_batch::config::PipelineConfig;
use imagery_batch::context::RunContext;
use imagery_batch::models::item::WorkItem;
use imagery_batch::models::status::ImageRequestStatus;
use imagery_batch::pipeline::{aggregator, dispatcher, tracker};
use imagery_batch::services::queue::RedisRequestChannel;
use imagery_batch::services::storage::{ObjectStore, S3ObjectStore};

use helpers::{collection_of, scored_feature};

/// Integration test: dispatch and aggregation against real services.
///
/// Exercises:
/// 1. Redis connectivity and request publishing
/// 2. S3 result-store listing, reads and writes
/// 3. Ledger creation and tracker correlation
/// 4. Aggregate artifact round-trip
///
/// Note: this requires a running Redis instance and S3 credentials
/// configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_dispatch_and_aggregate_against_real_services() {
    let config = PipelineConfig::from_env().expect("Failed to load config");

    let results: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::new(&config.output_bucket, &config.region)
            .expect("Failed to initialize result store"),
    );
    let channel = Arc::new(
        RedisRequestChannel::new(&config.redis_url, &config.request_queue_key)
            .expect("Failed to initialize request channel"),
    );
    channel.health_check().await.expect("Redis unreachable");

    let ctx = RunContext::new(config.clone(), results.clone(), results.clone(), channel);

    // 1. Dispatch a single item and check its ledger record.
    let items = vec![WorkItem::from_uri("s3://imagery/integration/small.tif")];
    let outcome = dispatcher::submit(&ctx, &items).await;
    assert_eq!(outcome.status.len(), 1);
    assert_eq!(outcome.publish_errors, 0);

    let record = &outcome.status["s3://imagery/integration/small.tif"];
    assert_eq!(record.status, ImageRequestStatus::Started);
    assert!(!record.completed);

    // 2. Simulate the compute tier writing a result artifact.
    let job_prefix = config.job_prefix();
    let artifact_key = format!("{job_prefix}/small.geojson");
    let artifact = collection_of(vec![scored_feature("d1", 0.91)]);
    results
        .put(
            &artifact_key,
            &serde_json::to_vec(&artifact).unwrap(),
            "application/geo+json",
        )
        .await
        .expect("Failed to write test artifact");

    // 3. A single poll should observe it and mark the record succeeded.
    let mut status = outcome.status;
    let progress = tracker::check_progress(results.as_ref(), &job_prefix, &mut status)
        .await
        .expect("Progress check failed");
    assert!(progress.observed >= 1);
    assert!(status["s3://imagery/integration/small.tif"].completed);

    // 4. Merge and verify the aggregate round-trips through the store.
    let summary = aggregator::merge(results.as_ref(), &job_prefix, &config.job_name, None)
        .await
        .expect("Merge failed");
    assert!(summary.collection.len() >= 1);

    let total_key = aggregator::total_key(&job_prefix, &config.job_name);
    let fetched = results.get(&total_key).await.expect("Aggregate missing");
    let parsed: imagery_batch::models::feature::FeatureCollection =
        serde_json::from_slice(&fetched).unwrap();
    assert_eq!(parsed.len(), summary.collection.len());
}

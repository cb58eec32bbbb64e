//! In-memory service doubles and fixture builders shared by the test suite.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use imagery_batch::config::PipelineConfig;
use imagery_batch::context::RunContext;
use imagery_batch::models::feature::{Feature, FeatureCollection};
use imagery_batch::models::request::ImageRequest;
use imagery_batch::services::queue::{QueueError, RequestChannel};
use imagery_batch::services::storage::{ObjectStore, StorageError};

/// Object store backed by a plain map.
pub struct MemoryObjectStore {
    bucket_name: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket_name: &str) -> Self {
        Self {
            bucket_name: bucket_name.to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn insert_collection(&self, key: &str, collection: &FeatureCollection) {
        self.insert(key, serde_json::to_vec(collection).unwrap());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get_collection(&self, key: &str) -> Option<FeatureCollection> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::Config(format!("no such key: {key}")))
    }

    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// Request channel that records every published request; publishes whose
/// first image URL contains a configured marker fail.
#[derive(Default)]
pub struct MemoryRequestChannel {
    pub published: Mutex<Vec<ImageRequest>>,
    fail_markers: Mutex<Vec<String>>,
}

impl MemoryRequestChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_when_url_contains(&self, marker: &str) {
        self.fail_markers.lock().unwrap().push(marker.to_string());
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl RequestChannel for MemoryRequestChannel {
    async fn publish(&self, request: &ImageRequest) -> Result<String, QueueError> {
        let url = request.image_urls.first().cloned().unwrap_or_default();
        let failing = self
            .fail_markers
            .lock()
            .unwrap()
            .iter()
            .any(|marker| url.contains(marker));
        if failing {
            return Err(QueueError::Publish(format!("simulated failure for {url}")));
        }

        self.published.lock().unwrap().push(request.clone());
        Ok(format!("msg-{}", self.published_count()))
    }
}

/// A polygon feature carrying the minimum result-artifact properties.
pub fn scored_feature(id: &str, score: f64) -> Feature {
    let mut properties = Map::new();
    properties.insert("id".to_string(), Value::String(id.to_string()));
    properties.insert(
        "featureClasses".to_string(),
        json!([{ "class": "building", "score": score }]),
    );
    properties.insert("center_longitude".to_string(), json!(-77.03));
    properties.insert("center_latitude".to_string(), json!(38.89));
    Feature::new(unit_square_geometry(), properties)
}

/// Same as [`scored_feature`] but with `featureClasses` encoded as a JSON
/// string, the way some output drivers write it.
pub fn encoded_feature(id: &str, score: f64) -> Feature {
    let mut feature = scored_feature(id, score);
    let encoded = feature.properties["featureClasses"].to_string();
    feature
        .properties
        .insert("featureClasses".to_string(), Value::String(encoded));
    feature
}

pub fn unit_square_geometry() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
    })
}

pub fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection::new(features)
}

/// Pipeline configuration pointed at the in-memory doubles, with short
/// tracker intervals so tests never wait on the wall clock.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        input_mode: "s3_path".to_string(),
        s3_path: Some("s3://imagery/scenes/".to_string()),
        imagery_bucket: None,
        years: None,
        footprint_catalog_key: None,
        aoi_key: None,
        job_name: "test-job".to_string(),
        output_bucket: "results".to_string(),
        output_prefix: "output/".to_string(),
        model_endpoint_name: "buildings-test-g4".to_string(),
        model_endpoint_config_name: None,
        endpoint_control_url: None,
        region: "us-east-1".to_string(),
        account: "123456789012".to_string(),
        tile_size: 1024,
        tile_overlap: 64,
        tile_format: "GTIFF".to_string(),
        tile_compression: "LZW".to_string(),
        poll_interval_secs: 1,
        timeout_mins: 1,
        confidence_threshold: 0.5,
        redis_url: "redis://localhost:6379".to_string(),
        request_queue_key: "imagery_batch:image_requests".to_string(),
        results_dir: None,
    }
}

pub struct TestHarness {
    pub imagery: Arc<MemoryObjectStore>,
    pub results: Arc<MemoryObjectStore>,
    pub channel: Arc<MemoryRequestChannel>,
    pub ctx: RunContext,
}

pub fn harness(config: PipelineConfig) -> TestHarness {
    let imagery = Arc::new(MemoryObjectStore::new("imagery"));
    let results = Arc::new(MemoryObjectStore::new(&config.output_bucket));
    let channel = Arc::new(MemoryRequestChannel::new());
    let ctx = RunContext::new(
        config,
        imagery.clone(),
        results.clone(),
        channel.clone(),
    );
    TestHarness {
        imagery,
        results,
        channel,
        ctx,
    }
}

//! Confidence thresholding and simple-feature export of a merged collection.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::models::feature::{Feature, FeatureCollection};
use crate::pipeline::PipelineError;

/// Keep every feature whose first-listed classification score strictly
/// exceeds `threshold`. Returns the filtered collection and the number of
/// features dropped.
///
/// Pure function of its inputs: the source collection is never mutated. A
/// feature with no decodable score cannot exceed any threshold and is
/// dropped (with a warning).
pub fn filter_collection(
    collection: &FeatureCollection,
    threshold: f64,
) -> (FeatureCollection, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0usize;

    for feature in &collection.features {
        match feature.best_score() {
            Some(score) if score > threshold => kept.push(feature.clone()),
            Some(_) => dropped += 1,
            None => {
                tracing::warn!(
                    id = feature.id().as_deref().unwrap_or("<none>"),
                    "feature has no decodable classification score, dropping"
                );
                dropped += 1;
            }
        }
    }

    tracing::info!(
        threshold,
        kept = kept.len(),
        dropped,
        total = collection.len(),
        "threshold filter applied"
    );

    let mut filtered = FeatureCollection::new(kept);
    filtered.crs = collection.crs.clone();
    (filtered, dropped)
}

/// Re-encode a filtered collection into the flat simple-feature export
/// schema: polygon geometry plus `{id, score, center_lon, center_lat}`.
/// The source CRS is preserved; absent one, WGS84 is assumed.
pub fn flatten_for_export(collection: &FeatureCollection) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| {
            let mut properties = Map::new();
            properties.insert(
                "id".to_string(),
                Value::String(feature.id().unwrap_or_default()),
            );
            properties.insert(
                "score".to_string(),
                feature.best_score().map_or(Value::Null, |score| {
                    serde_json::Number::from_f64(score).map_or(Value::Null, Value::Number)
                }),
            );
            properties.insert(
                "center_lon".to_string(),
                feature
                    .center_longitude()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            );
            properties.insert(
                "center_lat".to_string(),
                feature
                    .center_latitude()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            );
            Feature::new(feature.geometry.clone(), properties)
        })
        .collect();

    let mut flattened = FeatureCollection::new(features);
    flattened.crs = Some(
        collection
            .crs
            .clone()
            .unwrap_or_else(FeatureCollection::default_crs),
    );
    flattened
}

/// Write the thresholded export artifact under `dir`, returning its path.
pub async fn export(
    filtered: &FeatureCollection,
    job_name: &str,
    threshold: f64,
    dir: &Path,
) -> Result<PathBuf, PipelineError> {
    let flattened = flatten_for_export(filtered);

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{job_name}-total-thresh-{threshold}.geojson"));
    let payload = serde_json::to_vec(&flattened)?;
    tokio::fs::write(&path, payload).await?;

    tracing::info!(
        path = %path.display(),
        features = flattened.len(),
        "thresholded export written"
    );
    Ok(path)
}

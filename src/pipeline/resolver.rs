//! Turns the configured input source into a deduplicated list of image URIs.

use std::collections::HashSet;
use std::str::FromStr;

use serde_json::Value;

use crate::config::InputMode;
use crate::context::RunContext;
use crate::models::feature::FeatureCollection;
use crate::pipeline::geometry::{outer_rings, rings_intersect, Ring};
use crate::pipeline::PipelineError;
use crate::services::storage::ObjectStore;

const RASTER_EXTENSIONS: [&str; 2] = [".tif", ".tiff"];

/// Resolve the run's input imagery per the configured selection mode.
///
/// An unsupported mode is a configuration error, not a crash: it logs and
/// yields an empty set, which short-circuits the rest of the pipeline.
pub async fn resolve(ctx: &RunContext) -> Result<Vec<String>, PipelineError> {
    let mode_name = ctx.config.input_mode.as_str();
    tracing::info!(mode = mode_name, "resolving input imagery");

    let mode = match InputMode::from_str(mode_name) {
        Ok(mode) => mode,
        Err(_) => {
            tracing::error!(mode = mode_name, "unsupported input mode, check configuration");
            return Ok(Vec::new());
        }
    };

    let images = match mode {
        InputMode::S3Path => match require(ctx.config.s3_path.as_deref(), "s3_path") {
            Some(s3_path) => resolve_s3_path(ctx.imagery.as_ref(), s3_path).await?,
            None => Vec::new(),
        },
        InputMode::Years => {
            let years = ctx.config.years_list();
            resolve_years(ctx.imagery.as_ref(), &years).await?
        }
        InputMode::Aoi => {
            let catalog_key = require(
                ctx.config.footprint_catalog_key.as_deref(),
                "footprint_catalog_key",
            );
            let aoi_key = require(ctx.config.aoi_key.as_deref(), "aoi_key");
            match (catalog_key, aoi_key) {
                (Some(catalog_key), Some(aoi_key)) => {
                    resolve_aoi(ctx.imagery.as_ref(), catalog_key, aoi_key).await?
                }
                _ => Vec::new(),
            }
        }
    };

    tracing::info!(count = images.len(), "input imagery resolved");
    Ok(images)
}

/// Missing settings are reported and degrade to an empty input set; they do
/// not abort a calling batch process.
fn require<'a>(value: Option<&'a str>, field: &str) -> Option<&'a str> {
    if value.is_none() {
        tracing::error!(field, "missing required setting for input mode");
    }
    value
}

fn is_raster(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    RASTER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Explicit single file or folder-of-files. A trailing `/` selects every
/// recognized raster under the prefix; otherwise the URI is returned as-is.
pub async fn resolve_s3_path(
    store: &dyn ObjectStore,
    s3_path: &str,
) -> Result<Vec<String>, PipelineError> {
    if !s3_path.ends_with('/') {
        return Ok(vec![s3_path.to_string()]);
    }

    let (bucket, prefix) = parse_s3_uri(s3_path)?;
    if bucket != store.bucket() {
        return Err(PipelineError::Config(format!(
            "s3_path bucket {bucket} does not match imagery store bucket {}",
            store.bucket()
        )));
    }

    tracing::info!(bucket = %bucket, prefix = %prefix, "scanning imagery folder");
    let keys = store.list(&prefix).await?;
    Ok(dedup(keys.into_iter().filter(|k| is_raster(k)).map(|k| store.uri(&k))))
}

/// Year-keyed catalog layout: each year lives under a fixed tile prefix, with
/// 2019 the odd one out (JPEG COGs instead of 4-band deflate).
pub async fn resolve_years(
    store: &dyn ObjectStore,
    years: &[String],
) -> Result<Vec<String>, PipelineError> {
    let mut uris = Vec::new();
    for year in years {
        let prefix = if year == "2019" {
            format!("orthoimagery-program/tiles/{year}/cogs/jpeg")
        } else {
            format!("orthoimagery-program/tiles/{year}/cogs/4-band-deflate")
        };

        tracing::info!(year = %year, prefix = %prefix, "scanning year catalog");
        let keys = store.list(&prefix).await?;
        uris.extend(keys.into_iter().filter(|k| is_raster(k)).map(|k| store.uri(&k)));
    }
    Ok(dedup(uris.into_iter()))
}

/// Spatial join: footprints from the imagery catalog that intersect the AOI
/// geometry. Both collections are expected in the same projected CRS; the
/// backing file of each intersecting footprint is read from its `file`
/// property.
pub async fn resolve_aoi(
    store: &dyn ObjectStore,
    catalog_key: &str,
    aoi_key: &str,
) -> Result<Vec<String>, PipelineError> {
    let catalog: FeatureCollection = serde_json::from_slice(&store.get(catalog_key).await?)?;
    let aoi: FeatureCollection = serde_json::from_slice(&store.get(aoi_key).await?)?;

    let aoi_rings: Vec<Ring> = aoi
        .features
        .iter()
        .flat_map(|feature| outer_rings(&feature.geometry))
        .collect();
    if aoi_rings.is_empty() {
        tracing::warn!(key = aoi_key, "AOI contains no polygon geometry");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for footprint in &catalog.features {
        let footprint_rings = outer_rings(&footprint.geometry);
        let intersects = footprint_rings
            .iter()
            .any(|ring| aoi_rings.iter().any(|aoi_ring| rings_intersect(ring, aoi_ring)));
        if !intersects {
            continue;
        }

        match footprint.properties.get("file").and_then(Value::as_str) {
            Some(file) => files.push(file.to_string()),
            None => {
                tracing::warn!("intersecting footprint has no file property, skipping");
            }
        }
    }

    Ok(dedup(files.into_iter()))
}

/// Split `s3://bucket/key` into bucket and key.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String), PipelineError> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| PipelineError::Config(format!("not an s3 URI: {uri}")))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| PipelineError::Config(format!("s3 URI has no key: {uri}")))?;
    Ok((bucket.to_string(), key.to_string()))
}

/// Deduplicate preserving first-seen order.
fn dedup(uris: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    uris.filter(|uri| seen.insert(uri.clone())).collect()
}

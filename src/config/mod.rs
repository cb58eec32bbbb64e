use serde::Deserialize;
use strum::EnumString;

use crate::models::request::{
    DEFAULT_TILE_COMPRESSION, DEFAULT_TILE_FORMAT, DEFAULT_TILE_OVERLAP, DEFAULT_TILE_SIZE,
};

/// How the set of input images is selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum InputMode {
    /// Explicit S3 file or folder: a trailing `/` means list the prefix.
    S3Path,
    /// Year-keyed public imagery catalog.
    Years,
    /// Spatial join of an imagery footprint catalog against an AOI geometry.
    Aoi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Input selection mode: "s3_path", "years", or "aoi". Parsed at resolve
    /// time so an unsupported value degrades to an empty input set instead of
    /// failing the whole run at startup.
    #[serde(default = "default_input_mode")]
    pub input_mode: String,

    /// S3 URI of a single image or an image folder (s3_path mode)
    pub s3_path: Option<String>,

    /// Bucket holding the year-keyed imagery catalog (years mode)
    pub imagery_bucket: Option<String>,

    /// Comma-separated list of catalog years (years mode)
    pub years: Option<String>,

    /// Object key of the imagery footprint catalog, GeoJSON (aoi mode)
    pub footprint_catalog_key: Option<String>,

    /// Object key of the AOI geometry, GeoJSON, same projected CRS (aoi mode)
    pub aoi_key: Option<String>,

    /// Job name: names the result prefix and the aggregate artifact
    pub job_name: String,

    /// Result store bucket
    pub output_bucket: String,

    /// Result store key prefix, including any trailing separator
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Compute endpoint the requests are addressed to
    pub model_endpoint_name: String,

    /// Endpoint configuration used when creating the endpoint
    pub model_endpoint_config_name: Option<String>,

    /// Base URL of the compute control plane; endpoint lifecycle commands
    /// are skipped when unset
    pub endpoint_control_url: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_account")]
    pub account: String,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    #[serde(default = "default_tile_overlap")]
    pub tile_overlap: u32,

    #[serde(default = "default_tile_format")]
    pub tile_format: String,

    #[serde(default = "default_tile_compression")]
    pub tile_compression: String,

    /// Seconds between result-store polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Minutes to wait for a job before declaring it incomplete
    #[serde(default = "default_timeout_mins")]
    pub timeout_mins: u64,

    /// Confidence cutoff for the thresholded export (strictly greater-than)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Redis connection string for the request channel
    pub redis_url: String,

    /// Redis list the compute tier consumes image requests from
    #[serde(default = "default_request_queue_key")]
    pub request_queue_key: String,

    /// Local directory for cached copies of merged and exported artifacts
    pub results_dir: Option<String>,
}

fn default_input_mode() -> String {
    "s3_path".to_string()
}

fn default_output_prefix() -> String {
    "output/".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_account() -> String {
    "123456789012".to_string()
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_tile_overlap() -> u32 {
    DEFAULT_TILE_OVERLAP
}

fn default_tile_format() -> String {
    DEFAULT_TILE_FORMAT.to_string()
}

fn default_tile_compression() -> String {
    DEFAULT_TILE_COMPRESSION.to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_timeout_mins() -> u64 {
    30
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_request_queue_key() -> String {
    "imagery_batch:image_requests".to_string()
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Result-store prefix for this run's job: `<output_prefix><job_name>`.
    pub fn job_prefix(&self) -> String {
        format!("{}{}", self.output_prefix, self.job_name)
    }

    /// Years list from the comma-separated setting.
    pub fn years_list(&self) -> Vec<String> {
        self.years
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(str::to_string)
            .collect()
    }
}

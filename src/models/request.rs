use serde::{Deserialize, Serialize};

pub const DEFAULT_TILE_SIZE: u32 = 1024;
pub const DEFAULT_TILE_OVERLAP: u32 = 64;
pub const DEFAULT_TILE_FORMAT: &str = "GTIFF";
pub const DEFAULT_TILE_COMPRESSION: &str = "LZW";

/// Destination for result artifacts of one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputSink {
    #[serde(rename = "type")]
    pub kind: String,
    pub bucket: String,
    pub prefix: String,
}

/// The compute endpoint asked to run the inference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageProcessor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request message published once per work item to the request channel.
///
/// Wire format matches what the compute tier consumes; field names are
/// camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub job_id: String,
    pub job_name: String,
    pub job_arn: String,
    pub image_urls: Vec<String>,
    pub outputs: Vec<OutputSink>,
    pub image_processor: ImageProcessor,
    pub image_processor_tile_size: u32,
    pub image_processor_tile_overlap: u32,
    pub image_processor_tile_format: String,
    pub image_processor_tile_compression: String,
}

impl ImageRequest {
    pub fn builder() -> ImageRequestBuilder {
        ImageRequestBuilder::default()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestBuildError {
    #[error("image request is missing required field: {0}")]
    MissingField(&'static str),
}

/// Builder for [`ImageRequest`]: incomplete configurations are rejected at
/// construction time, not at serialization time.
#[derive(Debug, Default, Clone)]
pub struct ImageRequestBuilder {
    job_id: Option<String>,
    job_name: Option<String>,
    region: Option<String>,
    account: Option<String>,
    image_urls: Vec<String>,
    output_bucket: Option<String>,
    output_prefix: Option<String>,
    endpoint_name: Option<String>,
    tile_size: Option<u32>,
    tile_overlap: Option<u32>,
    tile_format: Option<String>,
    tile_compression: Option<String>,
}

impl ImageRequestBuilder {
    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }

    /// Region and account feed the derived job ARN.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_urls.push(url.into());
        self
    }

    pub fn output(mut self, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.output_bucket = Some(bucket.into());
        self.output_prefix = Some(prefix.into());
        self
    }

    pub fn endpoint_name(mut self, name: impl Into<String>) -> Self {
        self.endpoint_name = Some(name.into());
        self
    }

    pub fn tile_size(mut self, size: u32) -> Self {
        self.tile_size = Some(size);
        self
    }

    pub fn tile_overlap(mut self, overlap: u32) -> Self {
        self.tile_overlap = Some(overlap);
        self
    }

    pub fn tile_format(mut self, format: impl Into<String>) -> Self {
        self.tile_format = Some(format.into());
        self
    }

    pub fn tile_compression(mut self, compression: impl Into<String>) -> Self {
        self.tile_compression = Some(compression.into());
        self
    }

    pub fn build(self) -> Result<ImageRequest, RequestBuildError> {
        let job_id = self.job_id.ok_or(RequestBuildError::MissingField("jobId"))?;
        let job_name = self
            .job_name
            .ok_or(RequestBuildError::MissingField("jobName"))?;
        let bucket = self
            .output_bucket
            .ok_or(RequestBuildError::MissingField("outputs.bucket"))?;
        let prefix = self
            .output_prefix
            .ok_or(RequestBuildError::MissingField("outputs.prefix"))?;
        let endpoint_name = self
            .endpoint_name
            .ok_or(RequestBuildError::MissingField("imageProcessor.name"))?;
        if self.image_urls.is_empty() {
            return Err(RequestBuildError::MissingField("imageUrls"));
        }

        let region = self.region.unwrap_or_else(|| "us-east-1".to_string());
        let account = self.account.unwrap_or_else(|| "123456789012".to_string());
        let job_arn = format!("arn:aws:oversightml:{region}:{account}:ipj/{job_name}");

        Ok(ImageRequest {
            job_id,
            job_name,
            job_arn,
            image_urls: self.image_urls,
            outputs: vec![OutputSink {
                kind: "S3".to_string(),
                bucket,
                prefix,
            }],
            image_processor: ImageProcessor {
                name: endpoint_name,
                kind: "SM_ENDPOINT".to_string(),
            },
            image_processor_tile_size: self.tile_size.unwrap_or(DEFAULT_TILE_SIZE),
            image_processor_tile_overlap: self.tile_overlap.unwrap_or(DEFAULT_TILE_OVERLAP),
            image_processor_tile_format: self
                .tile_format
                .unwrap_or_else(|| DEFAULT_TILE_FORMAT.to_string()),
            image_processor_tile_compression: self
                .tile_compression
                .unwrap_or_else(|| DEFAULT_TILE_COMPRESSION.to_string()),
        })
    }
}

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Durable object store holding input imagery and result artifacts.
///
/// Bucket-scoped, like the pipeline's view of the world: one handle per
/// bucket, keys relative to it. Injected into the pipeline so tests can
/// substitute an in-memory store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Full `s3://` URI for a key in this store.
    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket(), key)
    }
}

/// S3-backed object store.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Credentials are resolved from the environment / shared config, the
    /// standard deployment shape for this pipeline.
    pub fn new(bucket_name: &str, region: &str) -> Result<Self, StorageError> {
        let region: Region = region
            .parse()
            .map_err(|e: <Region as std::str::FromStr>::Err| StorageError::Config(e.to_string()))?;

        let credentials =
            Credentials::default().map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            bucket_name: bucket_name.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(StorageError::S3)?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.bucket.get_object(key).await.map_err(StorageError::S3)?;
        Ok(response.to_vec())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("storage configuration error: {0}")]
    Config(String),
}

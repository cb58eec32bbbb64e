use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::request::ImageRequest;

/// Channel the compute tier consumes image requests from.
///
/// The pipeline only ever publishes; results come back through the object
/// store, never through this channel.
#[async_trait]
pub trait RequestChannel: Send + Sync {
    /// Publish one request, returning the channel-assigned message id.
    async fn publish(&self, request: &ImageRequest) -> Result<String, QueueError>;
}

/// Redis-backed request channel: requests are pushed onto a list the compute
/// tier pops from.
pub struct RedisRequestChannel {
    client: redis::Client,
    queue_key: String,
}

impl RedisRequestChannel {
    pub fn new(redis_url: &str, queue_key: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self {
            client,
            queue_key: queue_key.to_string(),
        })
    }

    /// Check connectivity before a run starts submitting.
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Number of requests not yet picked up by the compute tier.
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let depth: u64 = conn
            .llen(&self.queue_key)
            .await
            .map_err(QueueError::Redis)?;
        Ok(depth)
    }
}

#[async_trait]
impl RequestChannel for RedisRequestChannel {
    async fn publish(&self, request: &ImageRequest) -> Result<String, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(request).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(&self.queue_key, &payload)
            .await
            .map_err(QueueError::Redis)?;

        // Redis assigns no message id of its own; synthesize one so the
        // status ledger can reference the publish.
        Ok(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),
}

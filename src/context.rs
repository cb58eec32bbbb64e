use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::services::queue::RequestChannel;
use crate::services::storage::ObjectStore;

/// Service handles shared by every pipeline stage of one run.
///
/// Handles are constructed explicitly and injected, never process-global, so
/// tests can run the full pipeline against in-memory doubles.
#[derive(Clone)]
pub struct RunContext {
    pub config: PipelineConfig,
    /// Store holding the input imagery (resolver reads from here).
    pub imagery: Arc<dyn ObjectStore>,
    /// Result store the compute tier writes artifacts into.
    pub results: Arc<dyn ObjectStore>,
    pub channel: Arc<dyn RequestChannel>,
}

impl RunContext {
    pub fn new(
        config: PipelineConfig,
        imagery: Arc<dyn ObjectStore>,
        results: Arc<dyn ObjectStore>,
        channel: Arc<dyn RequestChannel>,
    ) -> Self {
        Self {
            config,
            imagery,
            results,
            channel,
        }
    }
}

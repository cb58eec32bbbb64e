use serde::{Deserialize, Serialize};

/// One image scheduled for independent processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    /// Stable identity derived from the source URI basename.
    pub id: String,
    pub source_uri: String,
}

impl WorkItem {
    pub fn from_uri(source_uri: impl Into<String>) -> Self {
        let source_uri = source_uri.into();
        Self {
            id: image_basename(&source_uri).to_string(),
            source_uri,
        }
    }
}

/// Basename of an image URI or object key, without extension.
///
/// `s3://bucket/tiles/scene_042.tif` -> `scene_042`. Result artifacts are
/// correlated back to their work item through this name.
pub fn image_basename(uri: &str) -> &str {
    let file = uri.rsplit('/').next().unwrap_or(uri);
    file.split('.').next().unwrap_or(file)
}

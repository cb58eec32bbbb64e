use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single `{class, score}` classification attached to a detected feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureClass {
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub score: f64,
}

/// One detected feature from a result artifact (GeoJSON Feature).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn new(geometry: Value, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            geometry,
            properties,
        }
    }

    /// Feature identifier from the `id` property, if present.
    pub fn id(&self) -> Option<String> {
        match self.properties.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }

    /// Decode the `featureClasses` property.
    ///
    /// The compute tier writes this either as a JSON array or as the same
    /// array encoded into a string, depending on the output driver.
    pub fn feature_classes(&self) -> Result<Vec<FeatureClass>, serde_json::Error> {
        match self.properties.get("featureClasses") {
            Some(Value::String(encoded)) => serde_json::from_str(encoded),
            Some(value) => serde_json::from_value(value.clone()),
            None => Ok(Vec::new()),
        }
    }

    /// Confidence score of the first-listed classification.
    pub fn best_score(&self) -> Option<f64> {
        self.feature_classes()
            .ok()
            .and_then(|classes| classes.first().map(|c| c.score))
    }

    fn float_property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(Value::as_f64)
    }

    pub fn center_longitude(&self) -> Option<f64> {
        self.float_property("center_longitude")
    }

    pub fn center_latitude(&self) -> Option<f64> {
        self.float_property("center_latitude")
    }
}

/// A GeoJSON feature collection: the shape of every result artifact,
/// of the merged "total" artifact, and of the thresholded export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            crs: None,
            features,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// CRS object for a well-known geographic reference (WGS84), used when a
    /// collection carries no CRS of its own.
    pub fn default_crs() -> Value {
        serde_json::json!({
            "type": "name",
            "properties": { "name": "EPSG:4326" }
        })
    }
}

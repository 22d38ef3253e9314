//! Resource: the typed bag of records that flows through a pipeline

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record; no fixed schema
pub type Record = Map<String, Value>;

/// Unit of data threaded through every pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Domain kind, e.g. `calendar_event`
    pub resource_type: String,

    /// Side-channel data that is not part of the record list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Records, possibly empty
    #[serde(default)]
    pub data: Vec<Record>,
}

impl Resource {
    /// Create a resource with no metadata
    pub fn new(resource_type: impl Into<String>, data: Vec<Record>) -> Self {
        Self {
            resource_type: resource_type.into(),
            metadata: None,
            data,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Number of records
    pub fn record_count(&self) -> usize {
        self.data.len()
    }

    /// Parse a resource from its JSON shape
    /// (`{ resourceType, metadata?, data }`)
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Wrap a raw API response: every field except `items_key` becomes
    /// metadata, and the array under `items_key` becomes the records.
    pub fn from_raw_json(
        value: Value,
        resource_type: impl Into<String>,
        items_key: &str,
    ) -> Result<Self> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(Error::Config(format!(
                    "expected a JSON object to wrap as a resource, got {}",
                    json_kind(&other)
                )))
            }
        };

        let items = match object.remove(items_key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::Config(format!(
                    "expected '{}' to be an array, got {}",
                    items_key,
                    json_kind(&other)
                )))
            }
            None => Vec::new(),
        };

        let data = items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(Error::Config(format!(
                    "expected every '{}' entry to be an object, got {}",
                    items_key,
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resource_type: resource_type.into(),
            metadata: Some(object),
            data,
        })
    }

    /// Records that carry a `target` field
    pub fn records_with<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.data.iter().filter(move |record| record.contains_key(target))
    }
}

/// JSON type name for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Node parameter schemas
//!
//! Each node type declares the parameters its transform reads, with a
//! human-readable description and an optional default. A parameter without
//! a default is mandatory.

use crate::value::ParamValue;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A single declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    /// Parameter name as written in manifests
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Value used when neither an override nor an instance value exists
    pub default_value: Option<ParamValue>,
}

impl SchemaProperty {
    /// True when the parameter has no default
    pub fn is_mandatory(&self) -> bool {
        self.default_value.is_none()
    }
}

/// Ordered set of parameters recognized by a node type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    properties: Vec<SchemaProperty>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a mandatory parameter
    pub fn required(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.push(name.into(), description.into(), None)
    }

    /// Declare a parameter with a default value
    pub fn optional(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        default_value: impl Into<ParamValue>,
    ) -> Self {
        self.push(name.into(), description.into(), Some(default_value.into()))
    }

    fn push(mut self, name: String, description: String, default_value: Option<ParamValue>) -> Self {
        // redeclaring a name replaces it in place
        let property = SchemaProperty {
            name,
            description,
            default_value,
        };
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Declared parameters in declaration order
    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    /// Parameter names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if no parameters are declared
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Serialize for SchemaProperty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.default_value.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("description", &self.description)?;
        if let Some(default) = &self.default_value {
            map.serialize_entry("defaultValue", &default.to_json())?;
        }
        map.end()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len()))?;
        for property in &self.properties {
            map.serialize_entry(&property.name, property)?;
        }
        map.end()
    }
}

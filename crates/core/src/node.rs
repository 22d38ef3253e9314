//! Node contract
//!
//! Every pipeline operator implements [`Node`]. A node owns the parameters it
//! was constructed with; on every call those are merged with per-call
//! overrides and schema defaults into a [`ResolvedParams`] that the
//! transform reads. Resolution never mutates the node.

use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::{ParamValue, Params, Pattern};
use async_trait::async_trait;

/// Operator contract consumed by the graph
#[async_trait]
pub trait Node: Send + Sync {
    /// Registered type name
    fn node_type(&self) -> &str;

    /// Parameters this node type recognizes
    fn schema(&self) -> &Schema;

    /// Parameters bound at construction time
    fn params(&self) -> &Params;

    /// Transform `resource` with fully resolved parameters
    async fn transform(&self, resource: Resource, params: ResolvedParams) -> Result<Resource>;

    /// Run the node with its construction-time parameters
    async fn process(&self, resource: Resource) -> Result<Resource> {
        let params = self.resolve_params(None)?;
        self.transform(resource, params).await
    }

    /// Run the node with per-call overrides taking precedence
    async fn process_with_overrides(
        &self,
        resource: Resource,
        overrides: &Params,
    ) -> Result<Resource> {
        let params = self.resolve_params(Some(overrides))?;
        self.transform(resource, params).await
    }

    /// Effective parameter set for one call
    fn resolve_params(&self, overrides: Option<&Params>) -> Result<ResolvedParams> {
        resolve_params(self.node_type(), self.schema(), self.params(), overrides)
    }
}

/// Resolve every schema parameter: override, else instance value, else
/// schema default, else [`Error::MandatoryParameter`].
///
/// Keys outside the schema (such as the manifest's `type`) are not carried
/// into the result.
pub fn resolve_params(
    node_type: &str,
    schema: &Schema,
    instance: &Params,
    overrides: Option<&Params>,
) -> Result<ResolvedParams> {
    let mut values = Params::with_capacity(schema.len());
    for property in schema.properties() {
        let name = property.name.as_str();
        let value = overrides
            .and_then(|o| o.get(name))
            .or_else(|| instance.get(name))
            .or(property.default_value.as_ref())
            .ok_or_else(|| Error::MandatoryParameter {
                node_type: node_type.to_string(),
                key: name.to_string(),
            })?;
        values.insert(name.to_string(), value.clone());
    }
    Ok(ResolvedParams {
        node_type: node_type.to_string(),
        values,
    })
}

/// Effective parameters for a single call, with typed accessors
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    node_type: String,
    values: Params,
}

impl ResolvedParams {
    /// Borrow a value
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// All resolved values
    pub fn values(&self) -> &Params {
        &self.values
    }

    /// Consume into the underlying map
    pub fn into_values(self) -> Params {
        self.values
    }

    /// A value the schema declares
    pub fn value(&self, key: &str) -> Result<&ParamValue> {
        self.values.get(key).ok_or_else(|| Error::MandatoryParameter {
            node_type: self.node_type.clone(),
            key: key.to_string(),
        })
    }

    /// A string parameter
    pub fn str(&self, key: &str) -> Result<&str> {
        let value = self.value(key)?;
        value.as_str().ok_or_else(|| self.invalid(key, "string", value))
    }

    /// A numeric parameter
    pub fn f64(&self, key: &str) -> Result<f64> {
        let value = self.value(key)?;
        value.as_f64().ok_or_else(|| self.invalid(key, "number", value))
    }

    /// A non-negative integral parameter
    pub fn usize(&self, key: &str) -> Result<usize> {
        let value = self.value(key)?;
        match value.as_f64() {
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 => Ok(n as usize),
            _ => Err(self.invalid(key, "non-negative integer", value)),
        }
    }

    /// A boolean parameter
    pub fn bool(&self, key: &str) -> Result<bool> {
        let value = self.value(key)?;
        value.as_bool().ok_or_else(|| self.invalid(key, "boolean", value))
    }

    /// A regular-expression parameter
    pub fn pattern(&self, key: &str) -> Result<&Pattern> {
        let value = self.value(key)?;
        value.as_pattern().ok_or_else(|| self.invalid(key, "pattern", value))
    }

    /// An array of strings
    pub fn str_list(&self, key: &str) -> Result<Vec<&str>> {
        let value = self.value(key)?;
        value
            .as_array()
            .and_then(|items| items.iter().map(ParamValue::as_str).collect::<Option<Vec<_>>>())
            .ok_or_else(|| self.invalid(key, "array of strings", value))
    }

    fn invalid(&self, key: &str, expected: &str, actual: &ParamValue) -> Error {
        Error::InvalidParameter {
            node_type: self.node_type.clone(),
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .optional("operation", "op", "===")
            .optional("target", "field", "contentValue")
            .required("targetValue", "value")
    }

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_resolution_order() {
        let instance = params(&[
            ("type", "Filter".into()),
            ("target", "summary".into()),
            ("targetValue", "standup".into()),
        ]);
        let overrides = params(&[("targetValue", "retro".into())]);

        let resolved = resolve_params("Filter", &schema(), &instance, Some(&overrides)).unwrap();
        assert_eq!(resolved.str("operation").unwrap(), "===");
        assert_eq!(resolved.str("target").unwrap(), "summary");
        assert_eq!(resolved.str("targetValue").unwrap(), "retro");
        assert!(resolved.get("type").is_none());
    }

    #[test]
    fn test_mandatory_parameter_missing() {
        let err = resolve_params("Filter", &schema(), &Params::new(), None).unwrap_err();
        match err {
            Error::MandatoryParameter { node_type, key } => {
                assert_eq!(node_type, "Filter");
                assert_eq!(key, "targetValue");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_override_satisfies_mandatory() {
        let overrides = params(&[("targetValue", 3i64.into())]);
        let resolved = resolve_params("Filter", &schema(), &Params::new(), Some(&overrides)).unwrap();
        assert_eq!(resolved.f64("targetValue").unwrap(), 3.0);
    }

    #[test]
    fn test_resolution_does_not_touch_inputs() {
        let instance = params(&[("targetValue", 1i64.into())]);
        let before = instance.clone();
        let _ = resolve_params("Filter", &schema(), &instance, None).unwrap();
        assert_eq!(instance, before);
    }

    #[test]
    fn test_process_with_overrides() {
        use crate::nodes::LimitNode;
        use crate::registry::NodeDescriptor;
        use crate::resource::Resource;
        use serde_json::json;

        let node = LimitNode::from_params(params(&[("count", 2i64.into())])).unwrap();
        let data = (0..4)
            .filter_map(|i| json!({ "i": i }).as_object().cloned())
            .collect();
        let input = Resource::new("test", data);

        let overrides = params(&[("count", 1i64.into())]);
        let out = tokio_test::block_on(node.process_with_overrides(input.clone(), &overrides)).unwrap();
        assert_eq!(out.record_count(), 1);

        let out = tokio_test::block_on(node.process(input)).unwrap();
        assert_eq!(out.record_count(), 2);
    }

    #[test]
    fn test_typed_accessors() {
        let schema = Schema::new()
            .required("count", "")
            .required("fields", "")
            .required("flag", "");
        let instance = params(&[
            ("count", 2.5.into()),
            ("fields", vec!["a", "b"].into()),
            ("flag", true.into()),
        ]);
        let resolved = resolve_params("T", &schema, &instance, None).unwrap();

        assert!(matches!(
            resolved.usize("count"),
            Err(Error::InvalidParameter { .. })
        ));
        assert_eq!(resolved.str_list("fields").unwrap(), vec!["a", "b"]);
        assert!(resolved.bool("flag").unwrap());
        assert!(matches!(resolved.str("flag"), Err(Error::InvalidParameter { .. })));
        assert!(matches!(
            resolved.value("undeclared"),
            Err(Error::MandatoryParameter { .. })
        ));
    }
}

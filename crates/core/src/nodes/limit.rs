//! Limit node - keep the first `count` records

use crate::error::Result;
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(LimitNode::type_schema);

/// Truncates the record list
pub struct LimitNode {
    params: Params,
}

impl NodeDescriptor for LimitNode {
    const TYPE_NAME: &'static str = "Limit";
    const DISPLAY_NAME: &'static str = "Limit";
    const DESCRIPTION: &'static str = "Limit the number of child data payloads.";

    fn type_schema() -> Schema {
        Schema::new().required(
            "count",
            "The number of child data payloads to keep. If there are fewer than this number, all payloads are kept.",
        )
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for LimitNode {
    fn node_type(&self) -> &str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &SCHEMA
    }

    fn params(&self) -> &Params {
        &self.params
    }

    async fn transform(&self, mut resource: Resource, params: ResolvedParams) -> Result<Resource> {
        let count = params.usize("count")?;
        resource.data.truncate(count);
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::nodes::test_support::{data_of, params, resource};
    use serde_json::json;

    #[tokio::test]
    async fn test_truncates() {
        let node = LimitNode::from_params(params(vec![("count", 2i64.into())])).unwrap();
        let out = node
            .process(resource(json!([{"a": 1}, {"a": 2}, {"a": 3}])))
            .await
            .unwrap();
        assert_eq!(data_of(&out), json!([{"a": 1}, {"a": 2}]));
    }

    #[tokio::test]
    async fn test_fewer_records_pass_unchanged() {
        let node = LimitNode::from_params(params(vec![("count", 2i64.into())])).unwrap();
        let input = resource(json!([{"a": 1}]));
        let out = node.process(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_override_and_validation() {
        let node = LimitNode::from_params(params(vec![("count", 2i64.into())])).unwrap();
        let out = node
            .process_with_overrides(
                resource(json!([{"a": 1}, {"a": 2}])),
                &params(vec![("count", 0i64.into())]),
            )
            .await
            .unwrap();
        assert!(out.data.is_empty());

        let bad = LimitNode::from_params(params(vec![("count", "two".into())])).unwrap();
        let err = bad.process(resource(json!([]))).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        let missing = LimitNode::from_params(Params::new()).unwrap();
        let err = missing.process(resource(json!([]))).await.unwrap_err();
        assert!(matches!(err, Error::MandatoryParameter { .. }));
    }
}

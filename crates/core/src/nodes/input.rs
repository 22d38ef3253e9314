//! Input node - declares the kind of resource a pipeline expects

use crate::error::Result;
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(InputNode::type_schema);

/// Pass-through marker naming the expected resource type
pub struct InputNode {
    params: Params,
}

impl NodeDescriptor for InputNode {
    const TYPE_NAME: &'static str = "Input";
    const DISPLAY_NAME: &'static str = "Input";
    const DESCRIPTION: &'static str = "Specify the type of resource to pull";

    fn type_schema() -> Schema {
        Schema::new().required("resourceType", "The type of resource to pull.")
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for InputNode {
    fn node_type(&self) -> &str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &SCHEMA
    }

    fn params(&self) -> &Params {
        &self.params
    }

    async fn transform(&self, resource: Resource, params: ResolvedParams) -> Result<Resource> {
        let expected = params.str("resourceType")?;
        if resource.resource_type != expected {
            tracing::warn!(
                "Input expects resource type '{}', got '{}'",
                expected,
                resource.resource_type
            );
        }
        Ok(resource)
    }
}

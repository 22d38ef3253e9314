//! Spoof node - overwrite one field on every record

use crate::error::Result;
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(SpoofNode::type_schema);

/// Sets `key` to `value` on every record
pub struct SpoofNode {
    params: Params,
}

impl NodeDescriptor for SpoofNode {
    const TYPE_NAME: &'static str = "Spoof";
    const DISPLAY_NAME: &'static str = "Spoof";
    const DESCRIPTION: &'static str = "Spoof resource data according to their contents";

    fn type_schema() -> Schema {
        Schema::new()
            .required("key", "The key on the resource data object to spoof")
            .required("value", "The value to replace the data with")
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for SpoofNode {
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
        let key = params.str("key")?;
        let value = params.value("value")?.to_json();
        for record in &mut resource.data {
            record.insert(key.to_string(), value.clone());
        }
        Ok(resource)
    }
}

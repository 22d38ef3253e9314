//! Select node - keep only the listed record fields

use crate::error::Result;
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(SelectNode::type_schema);

/// Projects every record onto `fields`
pub struct SelectNode {
    params: Params,
}

impl NodeDescriptor for SelectNode {
    const TYPE_NAME: &'static str = "Select";
    const DISPLAY_NAME: &'static str = "Select";
    const DESCRIPTION: &'static str = "Select fields to retrieve";

    fn type_schema() -> Schema {
        Schema::new().required("fields", "Fields to retrieve")
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for SelectNode {
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
        // TODO: dotted paths for nested fields
        let fields = params.str_list("fields")?;
        for record in &mut resource.data {
            record.retain(|key, _| fields.contains(&key.as_str()));
        }
        Ok(resource)
    }
}

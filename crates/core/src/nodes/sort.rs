//! Sort node - stable sort of records by one field

use super::compare::total_order;
use crate::error::{Error, Result};
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(SortNode::type_schema);

/// Orders records by `sortKey`
pub struct SortNode {
    params: Params,
}

impl NodeDescriptor for SortNode {
    const TYPE_NAME: &'static str = "Sort";
    const DISPLAY_NAME: &'static str = "Sort";
    const DESCRIPTION: &'static str = "Sort resource data according to their contents";

    fn type_schema() -> Schema {
        Schema::new()
            .required("sortKey", "The key on the resource data object to sort by")
            .required(
                "order",
                "The direction by which to sort the data: ascending or descending",
            )
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for SortNode {
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
        let sort_key = params.str("sortKey")?;
        let descending = match params.str("order")? {
            "ascending" => false,
            "descending" => true,
            other => {
                return Err(Error::InvalidParameter {
                    node_type: Self::TYPE_NAME.to_string(),
                    key: "order".to_string(),
                    expected: "ascending or descending".to_string(),
                    actual: format!("{:?}", other),
                })
            }
        };

        // records without the key go last in either direction
        resource.data.sort_by(|a, b| match (a.get(sort_key), b.get(sort_key)) {
            (Some(x), Some(y)) if descending => total_order(x, y).reverse(),
            (Some(x), Some(y)) => total_order(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(resource)
    }
}

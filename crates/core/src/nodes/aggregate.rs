//! Aggregate node - reduce records to summary values
//!
//! Scalar operations (`count`, `sum`, `average`) write their result into the
//! resource metadata under the operation name and empty the record list.
//! Grouped operations emit one `{contentType, contentValue}` record per group,
//! in order of first appearance.

use super::compare::group_label;
use crate::error::{Error, Result};
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::{json_kind, Record, Resource};
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(AggregateNode::type_schema);

/// Supported aggregations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOperation {
    /// Number of records carrying `target`
    Count,
    /// Sum of `target`
    Sum,
    /// Mean of `target`
    Average,
    /// Sum of `target` per `groupKey` value
    GroupSum,
    /// Mean of `target` per `groupKey` value
    GroupAverage,
    /// Occurrences of each distinct `target` value
    HistogramFrequency,
}

impl AggregateOperation {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "average" => Some(Self::Average),
            "groupSum" | "group_sum" => Some(Self::GroupSum),
            "groupAverage" | "group_average" => Some(Self::GroupAverage),
            "histogramFrequency" | "histogram_frequency" => Some(Self::HistogramFrequency),
            _ => None,
        }
    }
}

/// Summarizes records
pub struct AggregateNode {
    params: Params,
}

impl NodeDescriptor for AggregateNode {
    const TYPE_NAME: &'static str = "Aggregate";
    const DISPLAY_NAME: &'static str = "Aggregate";
    const DESCRIPTION: &'static str = "Aggregate payloads using an operation";

    fn type_schema() -> Schema {
        Schema::new()
            .optional(
                "target",
                "The target field on each payload to aggregate from",
                "contentValue",
            )
            .optional("operation", "The aggregation operation to perform", "count")
            .optional(
                "groupKey",
                "Field with which to group payloads to perform aggregations on",
                "contentType",
            )
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for AggregateNode {
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
        let operation_name = params.str("operation")?;
        let operation =
            AggregateOperation::parse(operation_name).ok_or_else(|| Error::InvalidParameter {
                node_type: Self::TYPE_NAME.to_string(),
                key: "operation".to_string(),
                expected: "count, sum, average, groupSum, groupAverage or histogramFrequency"
                    .to_string(),
                actual: format!("{:?}", operation_name),
            })?;
        let target = params.str("target")?;
        let group_key = params.str("groupKey")?;

        let matching: Vec<&Record> = resource.records_with(target).collect();
        let (key, scalar) = match operation {
            AggregateOperation::Count => ("count", json!(matching.len())),
            AggregateOperation::Sum => ("sum", float(sum(&matching, target)?)),
            AggregateOperation::Average => {
                let average = if matching.is_empty() {
                    Value::Null
                } else {
                    float(sum(&matching, target)? / matching.len() as f64)
                };
                ("average", average)
            }
            AggregateOperation::GroupSum => {
                let data = grouped(&matching, group_key, target, "group sum", |records| {
                    Ok(float(sum(records, target)?))
                })?;
                resource.data = data;
                return Ok(resource);
            }
            AggregateOperation::GroupAverage => {
                let data = grouped(&matching, group_key, target, "group average", |records| {
                    Ok(float(sum(records, target)? / records.len() as f64))
                })?;
                resource.data = data;
                return Ok(resource);
            }
            AggregateOperation::HistogramFrequency => {
                let data = grouped(&matching, target, target, "frequency", |records| {
                    Ok(json!(records.len()))
                })?;
                resource.data = data;
                return Ok(resource);
            }
        };

        resource
            .metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), scalar);
        resource.data.clear();
        Ok(resource)
    }
}

fn float(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn sum(records: &[&Record], target: &str) -> Result<f64> {
    records.iter().try_fold(0.0, |acc, record| match record.get(target) {
        Some(Value::Number(n)) => Ok(acc + n.as_f64().unwrap_or(0.0)),
        Some(other) => Err(Error::NodeExecution {
            node_type: AggregateNode::TYPE_NAME.to_string(),
            message: format!("Cannot sum '{}': found {}", target, json_kind(other)),
        }),
        None => Ok(acc),
    })
}

/// Group `records` by the value at `group_key` (records without it are
/// skipped) and emit one summary record per group
fn grouped<F>(
    records: &[&Record],
    group_key: &str,
    target: &str,
    label: &str,
    summarize: F,
) -> Result<Vec<Record>>
where
    F: Fn(&[&Record]) -> Result<Value>,
{
    let mut groups: Vec<(String, Vec<&Record>)> = Vec::new();
    for record in records {
        let Some(value) = record.get(group_key) else {
            continue;
        };
        let name = group_label(value);
        match groups.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, members)) => members.push(record),
            None => groups.push((name, vec![record])),
        }
    }
    tracing::debug!("Aggregated '{}' into {} groups", target, groups.len());

    groups
        .into_iter()
        .map(|(name, members)| {
            let mut out = Record::new();
            out.insert(
                "contentType".to_string(),
                Value::String(format!("{} {}", label, name)),
            );
            out.insert("contentValue".to_string(), summarize(&members)?);
            Ok(out)
        })
        .collect()
}

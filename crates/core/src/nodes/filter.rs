//! Filter node - keep records matching a predicate
//!
//! A record is kept when it has the `target` field and
//! `record[target] <operation> targetValue` holds. Records without the field
//! are dropped. Ordered comparisons between different JSON kinds are false.

use super::compare::{compare_values, includes, strict_equals};
use crate::error::{Error, Result};
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::{ParamValue, Params};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(FilterNode::type_schema);

/// Comparison applied between a record value and `targetValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperation {
    /// `===`
    Equal,
    /// `!==`
    NotEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// Substring or array membership
    Includes,
    /// Negated `includes`
    NotIncludes,
    /// Regular-expression match against a string value
    Matches,
}

impl FromStr for FilterOperation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "===" => Ok(FilterOperation::Equal),
            "!==" => Ok(FilterOperation::NotEqual),
            ">" => Ok(FilterOperation::Greater),
            ">=" => Ok(FilterOperation::GreaterOrEqual),
            "<" => Ok(FilterOperation::Less),
            "<=" => Ok(FilterOperation::LessOrEqual),
            "includes" => Ok(FilterOperation::Includes),
            "not includes" => Ok(FilterOperation::NotIncludes),
            "matches" => Ok(FilterOperation::Matches),
            other => Err(format!("unknown filter operation '{}'", other)),
        }
    }
}

/// Predicate filter over records
pub struct FilterNode {
    params: Params,
}

impl NodeDescriptor for FilterNode {
    const TYPE_NAME: &'static str = "Filter";
    const DISPLAY_NAME: &'static str = "Filter";
    const DESCRIPTION: &'static str = "Filter payloads based on a predicate";

    fn type_schema() -> Schema {
        Schema::new()
            .optional(
                "operation",
                "The operation to use to compare against targetValue. Order: (payload value) [operation] (targetValue)",
                "===",
            )
            .optional(
                "target",
                "The target property on the payload to compare",
                "contentValue",
            )
            .required("targetValue", "The value to compare against")
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for FilterNode {
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
            FilterOperation::from_str(operation_name).map_err(|_| Error::InvalidParameter {
                node_type: Self::TYPE_NAME.to_string(),
                key: "operation".to_string(),
                expected: "one of ===, !==, >, >=, <, <=, includes, not includes, matches"
                    .to_string(),
                actual: format!("{:?}", operation_name),
            })?;
        let target = params.str("target")?;
        let target_value = params.value("targetValue")?;

        if operation == FilterOperation::Matches && target_value.as_pattern().is_none() {
            return Err(Error::InvalidParameter {
                node_type: Self::TYPE_NAME.to_string(),
                key: "targetValue".to_string(),
                expected: "pattern".to_string(),
                actual: target_value.to_string(),
            });
        }

        let comparison = target_value.to_json();
        resource.data.retain(|record| match record.get(target) {
            Some(value) => evaluate(operation, value, target_value, &comparison),
            None => false,
        });
        Ok(resource)
    }
}

fn evaluate(operation: FilterOperation, value: &Value, raw: &ParamValue, comparison: &Value) -> bool {
    let ordering = || compare_values(value, comparison);
    match operation {
        FilterOperation::Equal => strict_equals(value, comparison),
        FilterOperation::NotEqual => !strict_equals(value, comparison),
        FilterOperation::Greater => ordering() == Some(Ordering::Greater),
        FilterOperation::GreaterOrEqual => {
            matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperation::Less => ordering() == Some(Ordering::Less),
        FilterOperation::LessOrEqual => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        FilterOperation::Includes => includes(value, comparison),
        FilterOperation::NotIncludes => !includes(value, comparison),
        FilterOperation::Matches => match (value, raw.as_pattern()) {
            (Value::String(s), Some(pattern)) => pattern.is_match(s),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{data_of, params, resource};
    use crate::value::Pattern;
    use serde_json::json;

    fn filter(pairs: Vec<(&str, ParamValue)>) -> FilterNode {
        FilterNode::from_params(params(pairs)).unwrap()
    }

    fn events() -> Resource {
        resource(json!([
            {"contentValue": 5, "summary": "daily standup"},
            {"contentValue": 20, "summary": "retro"},
            {"summary": "no value"},
            {"contentValue": "20"}
        ]))
    }

    #[tokio::test]
    async fn test_defaults_to_strict_equality_on_content_value() {
        let out = filter(vec![("targetValue", 20i64.into())])
            .process(events())
            .await
            .unwrap();
        assert_eq!(data_of(&out), json!([{"contentValue": 20, "summary": "retro"}]));
    }

    #[tokio::test]
    async fn test_ordered_comparisons() {
        let out = filter(vec![("operation", ">=".into()), ("targetValue", 5i64.into())])
            .process(events())
            .await
            .unwrap();
        assert_eq!(out.data.len(), 2);

        let out = filter(vec![("operation", "<".into()), ("targetValue", 10i64.into())])
            .process(events())
            .await
            .unwrap();
        assert_eq!(out.data.len(), 1);
    }

    #[tokio::test]
    async fn test_not_equal_drops_records_without_target() {
        let out = filter(vec![("operation", "!==".into()), ("targetValue", 5i64.into())])
            .process(events())
            .await
            .unwrap();
        assert_eq!(out.data.len(), 2);
    }

    #[tokio::test]
    async fn test_includes() {
        let out = filter(vec![
            ("operation", "includes".into()),
            ("target", "summary".into()),
            ("targetValue", "standup".into()),
        ])
        .process(events())
        .await
        .unwrap();
        assert_eq!(out.data.len(), 1);

        let out = filter(vec![
            ("operation", "not includes".into()),
            ("target", "summary".into()),
            ("targetValue", "standup".into()),
        ])
        .process(events())
        .await
        .unwrap();
        assert_eq!(out.data.len(), 2);
    }

    #[tokio::test]
    async fn test_matches_pattern() {
        let pattern = Pattern::new("^RE", "i").unwrap();
        let out = filter(vec![
            ("operation", "matches".into()),
            ("target", "summary".into()),
            ("targetValue", pattern.into()),
        ])
        .process(events())
        .await
        .unwrap();
        assert_eq!(data_of(&out), json!([{"contentValue": 20, "summary": "retro"}]));
    }

    #[tokio::test]
    async fn test_invalid_operation() {
        let err = filter(vec![("operation", "~=".into()), ("targetValue", 1i64.into())])
            .process(events())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        let err = filter(vec![("operation", "matches".into()), ("targetValue", "x".into())])
            .process(events())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}

//! Fuzz node - coarsen numeric values
//!
//! `range` replaces each value with a power-of-ten bin label such as
//! `"10-100"` (or `"10-50"` / `"50-100"` with `halfLogarithmic`).
//! `percent` replaces each value with its percentage of the largest value.
//! Records without the target field are dropped.

use crate::error::{Error, Result};
use crate::node::{Node, ResolvedParams};
use crate::registry::NodeDescriptor;
use crate::resource::{json_kind, Record, Resource};
use crate::schema::Schema;
use crate::value::Params;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(FuzzNode::type_schema);

/// Reduces the granularity of a numeric field
pub struct FuzzNode {
    params: Params,
}

impl NodeDescriptor for FuzzNode {
    const TYPE_NAME: &'static str = "Fuzz";
    const DISPLAY_NAME: &'static str = "Fuzz";
    const DESCRIPTION: &'static str =
        "Convert a fine-grained number into a format with coarser granularity";

    fn type_schema() -> Schema {
        Schema::new()
            .required(
                "fuzzType",
                "The type of fuzz operation to perform: range or percent",
            )
            .optional(
                "target",
                "The target property on payloads to fuzz",
                "contentValue",
            )
            .optional(
                "rangeType",
                "The type of range to apply, e.g. logarithmic, halfLogarithmic",
                "logarithmic",
            )
    }

    fn from_params(params: Params) -> Result<Self> {
        Ok(Self { params })
    }
}

#[async_trait]
impl Node for FuzzNode {
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
        let target = params.str("target")?;
        let matching: Vec<Record> = resource
            .data
            .into_iter()
            .filter(|record| record.contains_key(target))
            .collect();

        resource.data = match params.str("fuzzType")? {
            "range" => {
                let split_half = match params.str("rangeType")? {
                    "logarithmic" => false,
                    "halfLogarithmic" => true,
                    other => return Err(invalid("rangeType", "logarithmic or halfLogarithmic", other)),
                };
                fuzz_into_range(matching, target, split_half)?
            }
            "percent" => fuzz_into_percent(matching, target)?,
            other => return Err(invalid("fuzzType", "range or percent", other)),
        };
        Ok(resource)
    }
}

fn invalid(key: &str, expected: &str, actual: &str) -> Error {
    Error::InvalidParameter {
        node_type: FuzzNode::TYPE_NAME.to_string(),
        key: key.to_string(),
        expected: expected.to_string(),
        actual: format!("{:?}", actual),
    }
}

fn numeric(record: &Record, target: &str, operation: &str) -> Result<f64> {
    match record.get(target) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| non_numeric(operation, "number")),
        Some(other) => Err(non_numeric(operation, json_kind(other))),
        None => Err(non_numeric(operation, "nothing")),
    }
}

fn non_numeric(operation: &str, found: &str) -> Error {
    Error::NodeExecution {
        node_type: FuzzNode::TYPE_NAME.to_string(),
        message: format!("Can only perform {} fuzz on numeric values, found {}", operation, found),
    }
}

fn fuzz_into_range(records: Vec<Record>, target: &str, split_half: bool) -> Result<Vec<Record>> {
    records
        .into_iter()
        .map(|mut record| {
            let value = numeric(&record, target, "range")?;
            let (lo, hi) = logarithmic_bin(value, split_half);
            record.insert(target.to_string(), Value::String(format!("{}-{}", lo, hi)));
            Ok(record)
        })
        .collect()
}

/// Power-of-ten bin containing `value`; with `split_half` the bin is halved
/// at its midpoint, e.g. `[10, 100]` becomes `[10, 50]` or `[50, 100]`
pub fn logarithmic_bin(value: f64, split_half: bool) -> (f64, f64) {
    let sign = if value == 0.0 { 1.0 } else { value.signum() };
    let lo_pow = if value == 0.0 {
        0
    } else {
        value.abs().log10().floor() as i32
    };

    let mut lo = 10f64.powi(lo_pow) * sign;
    let mut hi = 10f64.powi(lo_pow + 1) * sign;
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }

    if split_half {
        let mid = lo * 5.0;
        if value < mid {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    (lo, hi)
}

fn fuzz_into_percent(records: Vec<Record>, target: &str) -> Result<Vec<Record>> {
    let values = records
        .iter()
        .map(|record| numeric(record, target, "percent"))
        .collect::<Result<Vec<f64>>>()?;

    let Some(max) = values.iter().copied().reduce(f64::max) else {
        return Ok(records);
    };
    if max == 0.0 {
        return Err(Error::NodeExecution {
            node_type: FuzzNode::TYPE_NAME.to_string(),
            message: "Cannot compute percentages against a maximum of zero".to_string(),
        });
    }

    Ok(records
        .into_iter()
        .zip(values)
        .map(|(mut record, value)| {
            let percent = serde_json::Number::from_f64(value * 100.0 / max)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            record.insert(target.to_string(), percent);
            record
        })
        .collect())
}

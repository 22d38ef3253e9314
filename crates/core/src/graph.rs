//! Pipeline graph
//!
//! A [`Graph`] is a linear sequence of named stages. Each stage name maps to
//! one instantiated [`Node`]; the same node may run more than once when a
//! pipeline repeats its name. Running a graph threads a single [`Resource`]
//! through every stage in order, awaiting each stage before starting the next.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::resource::Resource;
use crate::value::Params;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing for one executed stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePerformance {
    /// Stage name as written in the pipeline
    pub node_name: String,

    /// Wall-clock time spent in the stage, serialized in milliseconds
    #[serde(serialize_with = "duration_ms")]
    pub duration: Duration,

    /// Record count of the resource handed to the stage
    pub records_processed_on_entry: usize,
}

fn duration_ms<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

/// Final resource plus one [`NodePerformance`] per stage, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Output of the last stage
    pub result: Resource,

    /// Per-stage timing
    pub performance: Vec<NodePerformance>,
}

impl BenchmarkResult {
    /// Sum of all stage durations
    pub fn total_duration(&self) -> Duration {
        self.performance.iter().map(|p| p.duration).sum()
    }
}

/// Ordered, named sequence of instantiated nodes
#[derive(Clone, Default)]
pub struct Graph {
    title: String,
    description: String,
    pipeline: Vec<String>,
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            pipeline: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Parse a manifest against the process-wide built-in registry
    pub fn from_manifest(manifest: &str) -> Result<Self> {
        crate::manifest::GraphLoader::new(crate::nodes::default_registry()).parse(manifest)
    }

    /// Register `node` under `name` and append it to the pipeline
    pub fn add_node(&mut self, name: impl Into<String>, node: Arc<dyn Node>) -> Result<()> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(Error::DuplicateNode { name });
        }
        self.nodes.insert(name.clone(), node);
        self.pipeline.push(name);
        Ok(())
    }

    /// Run an already-registered node again at the end of the pipeline
    pub fn append_stage(&mut self, name: &str) -> Result<()> {
        if !self.nodes.contains_key(name) {
            return Err(Error::UnknownStage {
                name: name.to_string(),
            });
        }
        self.pipeline.push(name.to_string());
        Ok(())
    }

    /// Check if a node is registered under `name`
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Copy of the name to node map
    pub fn nodes(&self) -> HashMap<String, Arc<dyn Node>> {
        self.nodes.clone()
    }

    /// Stage names in execution order
    pub fn pipeline(&self) -> &[String] {
        &self.pipeline
    }

    /// Manifest title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Manifest description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run every stage and return the final resource
    pub async fn execute(&self, resource: Resource) -> Result<Resource> {
        Ok(self.benchmark(resource).await?.result)
    }

    /// Run every stage with per-node overrides and return the final resource
    pub async fn execute_with_overrides(
        &self,
        resource: Resource,
        overrides: &HashMap<String, Params>,
    ) -> Result<Resource> {
        Ok(self.benchmark_with_overrides(resource, overrides).await?.result)
    }

    /// Run every stage, timing each one
    pub async fn benchmark(&self, resource: Resource) -> Result<BenchmarkResult> {
        self.run(resource, None).await
    }

    /// Run every stage with per-node overrides, timing each one.
    ///
    /// `overrides` is keyed by stage name; a stage with no entry runs with
    /// its construction-time parameters.
    pub async fn benchmark_with_overrides(
        &self,
        resource: Resource,
        overrides: &HashMap<String, Params>,
    ) -> Result<BenchmarkResult> {
        self.run(resource, Some(overrides)).await
    }

    async fn run(
        &self,
        mut resource: Resource,
        overrides: Option<&HashMap<String, Params>>,
    ) -> Result<BenchmarkResult> {
        let mut performance = Vec::with_capacity(self.pipeline.len());

        for name in &self.pipeline {
            let node = self.nodes.get(name).ok_or_else(|| Error::UnknownStage {
                name: name.clone(),
            })?;
            let records_on_entry = resource.record_count();
            let start = Instant::now();

            resource = match overrides.and_then(|o| o.get(name)) {
                Some(params) => node.process_with_overrides(resource, params).await?,
                None => node.process(resource).await?,
            };

            let duration = start.elapsed();
            tracing::debug!(
                "Stage {} ({}) processed {} records in {:?}",
                name,
                node.node_type(),
                records_on_entry,
                duration
            );
            performance.push(NodePerformance {
                node_name: name.clone(),
                duration,
                records_processed_on_entry: records_on_entry,
            });
        }

        Ok(BenchmarkResult {
            result: resource,
            performance,
        })
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph{{title: {:?}, description: {:?}, pipeline: {:?}}}",
            self.title,
            self.description,
            self.pipeline.join(" -> ")
        )
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.nodes.iter().map(|(k, n)| (k, n.node_type())).collect();
        names.sort();
        f.debug_struct("Graph")
            .field("title", &self.title)
            .field("description", &self.description)
            .field("pipeline", &self.pipeline)
            .field("nodes", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{data_of, params, resource};
    use crate::nodes::{LimitNode, SpoofNode};
    use crate::registry::NodeDescriptor;
    use serde_json::json;

    fn limit(count: i64) -> Arc<dyn Node> {
        Arc::new(LimitNode::from_params(params(vec![("count", count.into())])).unwrap())
    }

    fn spoof(key: &str, value: &str) -> Arc<dyn Node> {
        Arc::new(
            SpoofNode::from_params(params(vec![("key", key.into()), ("value", value.into())]))
                .unwrap(),
        )
    }

    fn three() -> Resource {
        resource(json!([{"a": 1}, {"a": 2}, {"a": 3}]))
    }

    #[test]
    fn test_add_node_rejects_duplicates() {
        let mut graph = Graph::new("T", "D");
        graph.add_node("n1", limit(1)).unwrap();
        let err = graph.add_node("n1", limit(2)).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { ref name } if name == "n1"));
        assert_eq!(graph.pipeline(), ["n1"]);
        assert!(graph.has_node("n1"));
        assert!(!graph.has_node("n2"));
    }

    #[test]
    fn test_append_stage() {
        let mut graph = Graph::new("T", "D");
        graph.add_node("n1", limit(1)).unwrap();
        graph.append_stage("n1").unwrap();
        assert_eq!(graph.pipeline(), ["n1", "n1"]);
        assert_eq!(graph.nodes().len(), 1);
        assert!(matches!(
            graph.append_stage("n2"),
            Err(Error::UnknownStage { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_input() {
        let graph = Graph::new("T", "D");
        let input = three();
        let out = graph.benchmark(input.clone()).await.unwrap();
        assert_eq!(out.result, input);
        assert!(out.performance.is_empty());
    }

    #[tokio::test]
    async fn test_benchmark_records_on_entry() {
        let mut graph = Graph::new("T", "D");
        graph.add_node("tag", spoof("source", "calendar")).unwrap();
        graph.add_node("first two", limit(2)).unwrap();
        graph.add_node("first", limit(1)).unwrap();

        let out = graph.benchmark(three()).await.unwrap();
        let stages: Vec<(&str, usize)> = out
            .performance
            .iter()
            .map(|p| (p.node_name.as_str(), p.records_processed_on_entry))
            .collect();
        assert_eq!(stages, vec![("tag", 3), ("first two", 3), ("first", 2)]);
        assert_eq!(data_of(&out.result), json!([{"a": 1, "source": "calendar"}]));
        assert!(out.total_duration() >= out.performance[0].duration);
    }

    #[tokio::test]
    async fn test_overrides_apply_per_stage() {
        let mut graph = Graph::new("T", "D");
        graph.add_node("n1", limit(3)).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("n1".to_string(), params(vec![("count", 1i64.into())]));

        let out = graph.execute_with_overrides(three(), &overrides).await.unwrap();
        assert_eq!(out.record_count(), 1);

        // Overrides never stick to the node
        let out = graph.execute(three()).await.unwrap();
        assert_eq!(out.record_count(), 3);
    }

    #[tokio::test]
    async fn test_node_error_propagates() {
        let mut graph = Graph::new("T", "D");
        graph.add_node("n1", limit(-1)).unwrap();
        let err = graph.execute(three()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_display() {
        let mut graph = Graph::new("Meetings", "Weekly meetings");
        graph.add_node("a", limit(1)).unwrap();
        graph.add_node("b", limit(1)).unwrap();
        assert_eq!(
            graph.to_string(),
            r#"Graph{title: "Meetings", description: "Weekly meetings", pipeline: "a -> b"}"#
        );
    }

    #[test]
    fn test_performance_serializes_millis() {
        let perf = NodePerformance {
            node_name: "n1".to_string(),
            duration: Duration::from_millis(5),
            records_processed_on_entry: 3,
        };
        let value = serde_json::to_value(&perf).unwrap();
        assert_eq!(
            value,
            json!({"nodeName": "n1", "duration": 5.0, "recordsProcessedOnEntry": 3})
        );
    }
}

//! Manifest loader
//!
//! A manifest is line-oriented text:
//!
//! ```text
//! TITLE: Weekly meetings
//! DESCRIPTION: Meetings longer than half an hour
//! PIPELINE: long -> firstTwo
//!
//! long(
//!   type: "Filter",
//!   operation: ">",
//!   targetValue: 30
//! )
//! firstTwo(
//!   type: "Limit",
//!   count: 2
//! )
//! ```
//!
//! Parsing happens in two levels. The outer level finds tagged lines and
//! splits the remaining text into declarations; a declaration ends at the
//! first `)` that starts a line. The inner level hands each declaration body
//! to [`parse_object_literal`]. Every failure is reported as a single
//! [`Error::Parse`] whose [`Error::root_cause`] is the originating error.

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::literal::parse_object_literal;
use crate::node::Node;
use crate::registry::NodeRegistry;
use crate::value::{ParamValue, Params};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Title tag
pub const TITLE_TAG: &str = "TITLE";
/// Description tag
pub const DESCRIPTION_TAG: &str = "DESCRIPTION";
/// Pipeline tag
pub const PIPELINE_TAG: &str = "PIPELINE";

const RESERVED_TAGS: [&str; 3] = [TITLE_TAG, DESCRIPTION_TAG, PIPELINE_TAG];
const PIPELINE_SEPARATOR: &str = "->";

/// Pipeline entries containing a bracketed `[identifier]` are pass-through markers
static SKIP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Za-z0-9_]+\]").unwrap());

/// Builds a [`Graph`] from manifest text using an injected registry
#[derive(Debug, Clone, Copy)]
pub struct GraphLoader<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> GraphLoader<'a> {
    /// Create a loader resolving node types through `registry`
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    /// Parse a manifest into a graph
    pub fn parse(&self, manifest: &str) -> Result<Graph> {
        self.parse_graph(manifest)
            .map_err(|e| e.into_parse("Unable to parse graph", manifest))
    }

    fn parse_graph(&self, manifest: &str) -> Result<Graph> {
        let lines: Vec<&str> = manifest.lines().collect();
        let title = tag_value(&lines, TITLE_TAG)?;
        let description = tag_value(&lines, DESCRIPTION_TAG)?;
        let pipeline = pipeline_entries(tag_value(&lines, PIPELINE_TAG)?);

        let declared = self.parse_declarations(&declarations_block(&lines))?;

        let mut graph = Graph::new(title, description);
        for entry in pipeline {
            if SKIP_MARKER.is_match(entry) {
                debug!("Skipping pipeline marker {}", entry);
                continue;
            }
            if graph.has_node(entry) {
                graph.append_stage(entry)?;
                continue;
            }
            let node = declared
                .get(entry)
                .ok_or_else(|| Error::UnregisteredPipelineReference {
                    name: entry.to_string(),
                })?;
            graph.add_node(entry, Arc::clone(node))?;
        }

        info!(
            "Parsed graph '{}' with {} stages ({} declarations)",
            graph.title(),
            graph.pipeline().len(),
            declared.len()
        );
        Ok(graph)
    }

    /// Split the declaration block into named nodes.
    ///
    /// A name declared twice keeps its last declaration.
    fn parse_declarations(&self, block: &str) -> Result<HashMap<String, Arc<dyn Node>>> {
        let mut declared = HashMap::new();
        let mut rest = block;

        while rest.contains(')') {
            let Some(open) = rest.find('(') else {
                break;
            };
            let Some(close) = rest[open..].find("\n)").map(|i| open + i + 1) else {
                let fragment = rest.trim();
                return Err(Error::DeclarationSyntax {
                    fragment: fragment.to_string(),
                    reason: "closing parenthesis must start its own line".to_string(),
                }
                .into_parse("Could not parse node", fragment));
            };
            let declaration = rest[..=close].trim();
            let name = rest[..open].trim();
            let body = &rest[open + 1..close];

            let node = self
                .parse_node(name, body)
                .map_err(|e| e.into_parse("Could not parse node", declaration))?;
            if declared.insert(name.to_string(), node).is_some() {
                warn!("Node {} declared more than once; keeping the last declaration", name);
            }
            rest = &rest[close + 1..];
        }

        Ok(declared)
    }

    fn parse_node(&self, name: &str, body: &str) -> Result<Arc<dyn Node>> {
        if name.is_empty() {
            return Err(Error::DeclarationSyntax {
                fragment: body.trim().to_string(),
                reason: "declaration has no name".to_string(),
            });
        }

        let params = parse_object_literal(&format!("{{{}}}", body))?;
        let node_type = match params.get("type") {
            Some(ParamValue::String(node_type)) => node_type.clone(),
            _ => {
                return Err(Error::MissingType {
                    params: render_params(&params),
                })
            }
        };

        let node = self.registry.create_node(&node_type, params)?;
        debug!("Parsed node {} of type {}", name, node_type);
        Ok(node)
    }
}

/// Value of the first line starting with `"{tag}: "`, trimmed
pub fn tag_value<'m>(lines: &[&'m str], tag: &str) -> Result<&'m str> {
    let prefix = format!("{}: ", tag);
    lines
        .iter()
        .copied()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(str::trim)
        .ok_or_else(|| Error::ManifestFormat {
            tag: tag.to_string(),
        })
}

/// Trimmed pipeline entries in order.
///
/// Empty entries are kept and fail resolution like any other unknown name.
pub fn pipeline_entries(pipeline: &str) -> Vec<&str> {
    pipeline.split(PIPELINE_SEPARATOR).map(str::trim).collect()
}

/// Everything except tagged and blank lines
fn declarations_block(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !RESERVED_TAGS.iter().any(|tag| line.starts_with(tag)))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn render_params(params: &Params) -> String {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    pairs.sort();
    format!("{{{}}}", pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::resource;
    use serde_json::json;

    const LIMIT_TWO: &str = "TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  type: \"Limit\",\n  count: 2\n)";

    fn registry() -> NodeRegistry {
        NodeRegistry::with_builtin_nodes().unwrap()
    }

    fn parse(manifest: &str) -> Result<Graph> {
        GraphLoader::new(&registry()).parse(manifest)
    }

    #[tokio::test]
    async fn test_limit_manifest() {
        let graph = parse(LIMIT_TWO).unwrap();
        assert_eq!(graph.title(), "T");
        assert_eq!(graph.description(), "D");
        assert_eq!(graph.pipeline(), ["n1"]);

        let out = graph
            .execute(resource(json!([{"a": 1}, {"a": 2}, {"a": 3}])))
            .await
            .unwrap();
        assert_eq!(out.record_count(), 2);
        assert_eq!(out.resource_type, "test");
    }

    #[test]
    fn test_tag_values_are_trimmed() {
        let graph = parse("TITLE:   Spaced out  \nDESCRIPTION: D \nPIPELINE:  [none] \n").unwrap();
        assert_eq!(graph.title(), "Spaced out");
        assert_eq!(graph.description(), "D");
        assert!(graph.pipeline().is_empty());
    }

    #[test]
    fn test_first_tag_wins() {
        let graph = parse("TITLE: one\nTITLE: two\nDESCRIPTION: D\nPIPELINE: [none]").unwrap();
        assert_eq!(graph.title(), "one");
    }

    #[test]
    fn test_missing_tags() {
        for (manifest, tag) in [
            ("DESCRIPTION: D\nPIPELINE: ", "TITLE"),
            ("TITLE: T\nPIPELINE: ", "DESCRIPTION"),
            ("TITLE: T\nDESCRIPTION: D", "PIPELINE"),
            // the tag needs the space after the colon
            ("TITLE:T\nDESCRIPTION: D\nPIPELINE: ", "TITLE"),
        ] {
            let err = parse(manifest).unwrap_err();
            assert!(err.is_parse_error());
            match err.root_cause() {
                Error::ManifestFormat { tag: found } => assert_eq!(found, tag),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_unregistered_pipeline_reference() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1 -> n2\nn1(\n  type: \"Limit\",\n  count: 2\n)")
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::UnregisteredPipelineReference { name } if name == "n2"
        ));
    }

    #[test]
    fn test_pipeline_names_are_case_sensitive() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: N1\nn1(\n  type: \"Limit\",\n  count: 2\n)")
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::UnregisteredPipelineReference { .. }
        ));
    }

    #[test]
    fn test_skip_markers() {
        let graph = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: [start] -> n1 -> [end_2]\nn1(\n  type: \"Limit\",\n  count: 2\n)")
            .unwrap();
        assert_eq!(graph.pipeline(), ["n1"]);

        // a bracketed identifier anywhere in the entry marks it
        let graph = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1 -> later[x]\nn1(\n  type: \"Limit\",\n  count: 2\n)")
            .unwrap();
        assert_eq!(graph.pipeline(), ["n1"]);

        // brackets around anything but an identifier are a reference
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: [not a marker]").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::UnregisteredPipelineReference { .. }
        ));
    }

    #[test]
    fn test_empty_pipeline_entries_are_unregistered() {
        for pipeline in ["n1 -> -> n1", "", "n1 ->"] {
            let manifest = format!(
                "TITLE: T\nDESCRIPTION: D\nPIPELINE: {}\nn1(\n  type: \"Limit\",\n  count: 2\n)",
                pipeline
            );
            let err = parse(&manifest).unwrap_err();
            assert!(err.is_parse_error());
            assert!(
                matches!(err.root_cause(), Error::UnregisteredPipelineReference { name } if name.is_empty()),
                "{:?} resolved: {:?}",
                pipeline,
                err
            );
        }
    }

    #[test]
    fn test_missing_type() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  count: 2\n)").unwrap_err();
        assert!(matches!(err.root_cause(), Error::MissingType { .. }));

        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  type: 4\n)").unwrap_err();
        assert!(matches!(err.root_cause(), Error::MissingType { .. }));
    }

    #[test]
    fn test_unregistered_type() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  type: \"Restrict\"\n)").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::UnregisteredType { node_type } if node_type == "Restrict"
        ));
    }

    #[test]
    fn test_malformed_block_is_wrapped() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  type: \"Limit\",\n  count: {2\n)").unwrap_err();
        match &err {
            Error::Parse { message, source, .. } => {
                assert_eq!(message, "Unable to parse graph");
                assert!(matches!(**source, Error::Parse { ref message, .. } if message == "Could not parse node"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(err.root_cause(), Error::DeclarationSyntax { .. }));
    }

    #[test]
    fn test_close_paren_must_start_a_line() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(type: \"Limit\", count: 2)").unwrap_err();
        assert!(matches!(err.root_cause(), Error::DeclarationSyntax { .. }));
    }

    #[test]
    fn test_empty_name() {
        let err = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: \n(\n  type: \"Limit\",\n  count: 1\n)").unwrap_err();
        assert!(matches!(err.root_cause(), Error::DeclarationSyntax { .. }));
    }

    #[test]
    fn test_repeated_pipeline_entry_runs_twice() {
        let graph = parse("TITLE: T\nDESCRIPTION: D\nPIPELINE: n1 -> n1\nn1(\n  type: \"Limit\",\n  count: 2\n)")
            .unwrap();
        assert_eq!(graph.pipeline(), ["n1", "n1"]);
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn test_declarations_in_any_order_with_blank_lines() {
        let manifest = "\n\nb(\n  type: \"Limit\",\n  count: 1\n)\n\nTITLE: T\n\na(\n  type: 'Sort',\n  sortKey: 'a',\n  order: 'descending'\n)\nDESCRIPTION: D\nPIPELINE: a -> b\n";
        let graph = parse(manifest).unwrap();
        assert_eq!(graph.pipeline(), ["a", "b"]);
        let nodes = graph.nodes();
        assert_eq!(nodes["a"].node_type(), "Sort");
        assert_eq!(nodes["b"].node_type(), "Limit");
    }

    #[test]
    fn test_redeclared_name_keeps_last() {
        let manifest = "TITLE: T\nDESCRIPTION: D\nPIPELINE: n1\nn1(\n  type: \"Limit\",\n  count: 1\n)\nn1(\n  type: \"Limit\",\n  count: 5\n)";
        let graph = parse(manifest).unwrap();
        let count = graph.nodes()["n1"].params().get("count").cloned();
        assert_eq!(count, Some(ParamValue::Number(5.0)));
    }

    #[test]
    fn test_regex_and_array_params() {
        let manifest = "TITLE: T\nDESCRIPTION: D\nPIPELINE: standups -> trim\nstandups(\n  type: \"Filter\",\n  operation: \"matches\",\n  target: \"summary\",\n  targetValue: /stand-?up/i\n)\ntrim(\n  type: \"Select\",\n  fields: [\"summary\", \"start\"]\n)";
        let graph = parse(manifest).unwrap();
        let nodes = graph.nodes();
        let pattern = nodes["standups"].params()["targetValue"].as_pattern().cloned().unwrap();
        assert!(pattern.is_match("Daily StandUp"));
        assert_eq!(
            nodes["trim"].params()["fields"],
            ParamValue::from(vec!["summary", "start"])
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let graph = parse("TITLE: T\r\nDESCRIPTION: D\r\nPIPELINE: n1\r\nn1(\r\n  type: \"Limit\",\r\n  count: 2\r\n)\r\n").unwrap();
        assert_eq!(graph.title(), "T");
        assert_eq!(graph.pipeline(), ["n1"]);
    }

    #[test]
    fn test_pipeline_entries() {
        assert_eq!(pipeline_entries(" a ->b->  c "), vec!["a", "b", "c"]);
        assert_eq!(pipeline_entries("  "), vec![""]);
        assert_eq!(pipeline_entries("a -> -> b"), vec!["a", "", "b"]);
    }
}

//! MapAggregate Core - manifest-driven record pipelines
//!
//! This crate parses a small textual manifest into a [`Graph`] of named
//! operator nodes and runs a [`Resource`] (a typed bag of records with
//! optional metadata) through them in sequence.
//!
//! # Architecture
//!
//! - [`literal`] parses the object-literal parameter block of a declaration
//! - [`registry`] maps declared type names to node factories
//! - [`manifest`] turns manifest text into a [`Graph`]
//! - [`graph`] executes stages in order and records per-stage timing
//! - [`nodes`] holds the built-in operators and their registration table
//!
//! # Example
//!
//! ```ignore
//! use mapagg_core::{Graph, Resource};
//!
//! #[tokio::main]
//! async fn main() -> mapagg_core::Result<()> {
//!     let graph = Graph::from_manifest(
//!         "TITLE: T\nDESCRIPTION: D\nPIPELINE: top\ntop(\n  type: \"Limit\",\n  count: 2\n)",
//!     )?;
//!     let input = Resource::from_json_str(r#"{"resourceType":"photo","data":[{},{},{}]}"#)?;
//!     let output = graph.execute(input).await?;
//!     assert_eq!(output.record_count(), 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod graph;
pub mod literal;
pub mod manifest;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use graph::{BenchmarkResult, Graph, NodePerformance};
pub use literal::parse_object_literal;
pub use manifest::GraphLoader;
pub use node::{resolve_params, Node, ResolvedParams};
pub use registry::{NodeDescriptor, NodeFactory, NodeRegistration, NodeRegistry};
pub use resource::{Record, Resource};
pub use schema::{Schema, SchemaProperty};
pub use value::{ParamValue, Params, Pattern};

/// Initialize logging with an `EnvFilter` from `RUST_LOG`, defaulting to `info`.
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Config(e.to_string()))?;

    tracing::info!("MapAggregate Core initialized");
    Ok(())
}

/// Initialize logging from a [`RuntimeConfig`]
pub fn init_with_config(config: &RuntimeConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .map_err(|e| Error::Config(format!("invalid log filter '{}': {}", config.log_filter, e)))?;

    let installed = if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| Error::Config(e.to_string()))?;

    tracing::debug!("Logging initialized with filter {}", config.log_filter);
    Ok(())
}

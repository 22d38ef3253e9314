//! Built-in operator nodes
//!
//! Every built-in node implements [`Node`](crate::node::Node) and
//! [`NodeDescriptor`](crate::registry::NodeDescriptor). The registration
//! table below is the single place that decides which types a manifest can
//! reference.

use crate::error::Result;
use crate::registry::NodeRegistry;
use std::sync::OnceLock;

pub mod aggregate;
pub mod compare;
pub mod filter;
pub mod fuzz;
pub mod input;
pub mod limit;
pub mod select;
pub mod sort;
pub mod spoof;

pub use aggregate::AggregateNode;
pub use filter::FilterNode;
pub use fuzz::FuzzNode;
pub use input::InputNode;
pub use limit::LimitNode;
pub use select::SelectNode;
pub use sort::SortNode;
pub use spoof::SpoofNode;

/// Register every built-in node type
pub fn register_builtin_nodes(registry: &mut NodeRegistry) -> Result<()> {
    registry.register_node::<InputNode>()?;
    registry.register_node::<LimitNode>()?;
    registry.register_node::<FilterNode>()?;
    registry.register_node::<SortNode>()?;
    registry.register_node::<SelectNode>()?;
    registry.register_node::<FuzzNode>()?;
    registry.register_node::<AggregateNode>()?;
    registry.register_node::<SpoofNode>()?;
    Ok(())
}

static DEFAULT_REGISTRY: OnceLock<NodeRegistry> = OnceLock::new();

/// Process-wide registry of built-in nodes, built on first use.
///
/// # Panics
///
/// Panics if the built-in table registers a type name twice.
pub fn default_registry() -> &'static NodeRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        let mut registry = NodeRegistry::new();
        register_builtin_nodes(&mut registry)
            .expect("built-in node types must have unique names");
        registry
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_is_shared() {
        let a = default_registry() as *const NodeRegistry;
        let b = default_registry() as *const NodeRegistry;
        assert_eq!(a, b);
        assert_eq!(default_registry().len(), 8);
    }

    #[test]
    fn test_builtin_table_registers_every_type_once() {
        let mut registry = NodeRegistry::new();
        register_builtin_nodes(&mut registry).unwrap();
        assert_eq!(registry.len(), default_registry().len());

        // a second pass over the same table is rejected on the first name
        assert!(matches!(
            register_builtin_nodes(&mut registry),
            Err(crate::error::Error::DuplicateRegistration { node_type }) if node_type == "Input"
        ));
    }
}

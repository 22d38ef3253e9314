//! Node registry mapping declared type names to factories
//!
//! The registry is built once at startup from an explicit registration table
//! (see [`crate::nodes::register_builtin_nodes`]) and is read-only afterwards.
//! Manifests only reference type names that are already registered.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::schema::Schema;
use crate::value::Params;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Factory trait for creating node instances from parsed parameters
pub trait NodeFactory: Send + Sync {
    /// Create a new node bound to `params`
    fn create(&self, params: Params) -> Result<Arc<dyn Node>>;
}

impl<F> NodeFactory for F
where
    F: Fn(Params) -> Result<Arc<dyn Node>> + Send + Sync,
{
    fn create(&self, params: Params) -> Result<Arc<dyn Node>> {
        self(params)
    }
}

/// Static description of a node type, used for typed registration
pub trait NodeDescriptor: Node + Sized + 'static {
    /// Key referenced by the manifest's `type` parameter
    const TYPE_NAME: &'static str;

    /// Human-readable name
    const DISPLAY_NAME: &'static str;

    /// One-line description
    const DESCRIPTION: &'static str;

    /// Parameter schema for the type
    fn type_schema() -> Schema;

    /// Construct an instance from parsed manifest parameters
    fn from_params(params: Params) -> Result<Self>;
}

/// One registered node type
#[derive(Clone)]
pub struct NodeRegistration {
    /// Unique key referenced by manifests
    pub type_name: String,
    /// Human-readable name
    pub display_name: String,
    /// One-line description
    pub description: String,
    /// Parameter schema, empty when registered without one
    pub schema: Schema,
    factory: Arc<dyn NodeFactory>,
}

impl NodeRegistration {
    /// Create a registration record
    pub fn new(
        type_name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        factory: Arc<dyn NodeFactory>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            display_name: display_name.into(),
            description: description.into(),
            schema: Schema::new(),
            factory,
        }
    }

    /// Attach the parameter schema
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Instantiate a node of this type
    pub fn create(&self, params: Params) -> Result<Arc<dyn Node>> {
        self.factory.create(params)
    }
}

impl fmt::Debug for NodeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistration")
            .field("type_name", &self.type_name)
            .field("display_name", &self.display_name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Registry of node types
#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    registrations: HashMap<String, NodeRegistration>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in node type
    pub fn with_builtin_nodes() -> Result<Self> {
        let mut registry = Self::new();
        crate::nodes::register_builtin_nodes(&mut registry)?;
        Ok(registry)
    }

    /// Register a node type.
    ///
    /// Registering a type name twice fails with
    /// [`Error::DuplicateRegistration`] and leaves the first entry in place.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        factory: Arc<dyn NodeFactory>,
    ) -> Result<()> {
        self.insert(NodeRegistration::new(type_name, display_name, description, factory))
    }

    /// Register a node type described by [`NodeDescriptor`]
    pub fn register_node<T: NodeDescriptor>(&mut self) -> Result<()> {
        let factory: Arc<dyn NodeFactory> = Arc::new(|params: Params| -> Result<Arc<dyn Node>> {
            Ok(Arc::new(T::from_params(params)?))
        });
        self.insert(
            NodeRegistration::new(T::TYPE_NAME, T::DISPLAY_NAME, T::DESCRIPTION, factory)
                .with_schema(T::type_schema()),
        )
    }

    /// Insert a prepared registration record
    pub fn insert(&mut self, registration: NodeRegistration) -> Result<()> {
        if self.registrations.contains_key(&registration.type_name) {
            return Err(Error::DuplicateRegistration {
                node_type: registration.type_name,
            });
        }
        tracing::debug!("Registered node type: {}", registration.type_name);
        self.registrations
            .insert(registration.type_name.clone(), registration);
        Ok(())
    }

    /// Look up a registration by type name
    pub fn lookup(&self, type_name: &str) -> Option<&NodeRegistration> {
        self.registrations.get(type_name)
    }

    /// Check if a type name is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.registrations.contains_key(type_name)
    }

    /// Instantiate a node of a registered type
    pub fn create_node(&self, type_name: &str, params: Params) -> Result<Arc<dyn Node>> {
        self.lookup(type_name)
            .ok_or_else(|| Error::UnregisteredType {
                node_type: type_name.to_string(),
            })?
            .create(params)
    }

    /// List all registered type names, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.registrations.keys().cloned().collect();
        types.sort();
        types
    }

    /// Registrations sorted by type name
    pub fn registrations(&self) -> Vec<&NodeRegistration> {
        let mut all: Vec<&NodeRegistration> = self.registrations.values().collect();
        all.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        all
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

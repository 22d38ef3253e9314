//! Error types for MapAggregate Core

use thiserror::Error;

/// Result type alias for MapAggregate Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing manifests or running pipelines
#[derive(Debug, Error)]
pub enum Error {
    /// A required tagged line (`TITLE`, `DESCRIPTION`, `PIPELINE`) is missing
    #[error("Line with tag \"{tag}: \" was not found")]
    ManifestFormat {
        /// Tag that was looked up
        tag: String,
    },

    /// A declaration or its parameter block is not well-formed
    #[error("Invalid declaration syntax: {reason} (in `{fragment}`)")]
    DeclarationSyntax {
        /// Offending text fragment
        fragment: String,
        /// What went wrong
        reason: String,
    },

    /// A node declaration has no `type` parameter
    #[error("Missing required 'type' in params: {params}")]
    MissingType {
        /// Rendered parameter block
        params: String,
    },

    /// A node declaration names a type that was never registered
    #[error("Unregistered node type: {node_type}")]
    UnregisteredType {
        /// Declared type name
        node_type: String,
    },

    /// The pipeline references a node name with no declaration
    #[error("Unregistered node in pipeline: {name}")]
    UnregisteredPipelineReference {
        /// Pipeline entry
        name: String,
    },

    /// A node with this name is already on the graph
    #[error("A node named {name} is already on this graph")]
    DuplicateNode {
        /// Node name
        name: String,
    },

    /// A stage was appended for a name that has no node on the graph
    #[error("No node named {name} on this graph")]
    UnknownStage {
        /// Node name
        name: String,
    },

    /// A node type was registered twice
    #[error("Node type already registered: {node_type}")]
    DuplicateRegistration {
        /// Type name
        node_type: String,
    },

    /// Parameter resolution found no override, instance value, or default
    #[error("Missing mandatory parameter '{key}' for node type {node_type}")]
    MandatoryParameter {
        /// Node type performing the resolution
        node_type: String,
        /// Parameter name
        key: String,
    },

    /// A resolved parameter has the wrong shape for the node reading it
    #[error("Invalid parameter '{key}' for node type {node_type}: expected {expected}, got {actual}")]
    InvalidParameter {
        /// Node type reading the parameter
        node_type: String,
        /// Parameter name
        key: String,
        /// Expected shape
        expected: String,
        /// Rendered actual value
        actual: String,
    },

    /// An operator failed on its input
    #[error("Node {node_type} failed: {message}")]
    NodeExecution {
        /// Node type that failed
        node_type: String,
        /// Error message
        message: String,
    },

    /// Uniform manifest parse failure wrapping the originating error
    #[error("{message}")]
    Parse {
        /// Short description of the failing stage
        message: String,
        /// Manifest text or declaration fragment being parsed
        context: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap `self` as a parse failure over `context`
    pub(crate) fn into_parse(self, message: impl Into<String>, context: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Follow `Parse` wrappers down to the error that started the failure
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Parse { source, .. } = current {
            current = source;
        }
        current
    }

    /// True for the uniform manifest parse failure
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

use crate::graph::property::ValueType;

/// Convenience result type used across the engine.
pub type GraphResult<T> = Result<T, GraphError>;

/// Top-level error taxonomy used by graph, node and surface APIs.
///
/// Structural variants are returned before any mutation happens, so a failed edit leaves the
/// graph exactly as it was.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Connecting an output to an input of a different value type.
    #[error(
        "type mismatch: input '{input}' expects {input_type:?}, output '{output}' provides {output_type:?}"
    )]
    TypeMismatch {
        /// Name of the input property.
        input: String,
        /// Value type accepted by the input.
        input_type: ValueType,
        /// Name of the output property.
        output: String,
        /// Value type produced by the output.
        output_type: ValueType,
    },

    /// Two properties of the same direction share a name on one node.
    #[error("duplicate property: {0}")]
    DuplicateProperty(String),

    /// A node type tag that no registry entry knows about.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// A node id that is not part of the graph.
    #[error("unknown node: {0}")]
    UnknownNode(crate::foundation::core::NodeId),

    /// A property name or index that does not exist on a node.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// Use of a node, surface or texture after it was disposed.
    #[error("disposed: {0}")]
    Disposed(String),

    /// Invalid user-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while evaluating the graph for a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing graph documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraphError {
    /// Build a [`GraphError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GraphError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`GraphError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`GraphError::Disposed`] value.
    pub fn disposed(what: impl Into<String>) -> Self {
        Self::Disposed(what.into())
    }

    /// Build a [`GraphError::UnknownProperty`] value.
    pub fn unknown_property(name: impl Into<String>) -> Self {
        Self::UnknownProperty(name.into())
    }

    /// Return `true` for errors raised by rejected structural edits.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::DuplicateProperty(_)
                | Self::UnknownNodeType(_)
                | Self::UnknownNode(_)
                | Self::UnknownProperty(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Arena-backed error chains
//!
//! A [`ChainGraph`] owns a list of nodes and records each node's cause as an
//! index into that list. Unlike a boxed `source()` chain it can express a node
//! that is its own cause, or a loop spanning several nodes, which makes it the
//! input format for chain files and for exercising traversal edge cases.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::ErrorNode;
use crate::error::ErrorKind;

/// Errors raised while building or loading a chain graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The chain file could not be read.
    #[error("failed to read chain file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The chain document is not valid JSON for a chain graph.
    #[error("failed to parse chain: {0}")]
    Parse(#[from] serde_json::Error),

    /// A node names a cause that does not exist.
    #[error("node {node} has cause {cause}, but the chain only has {len} nodes")]
    DanglingCause { node: usize, cause: usize, len: usize },

    /// A node index was requested that does not exist.
    #[error("node {index} is out of range for a chain of {len} nodes")]
    OutOfRange { index: usize, len: usize },

    /// The chain has no nodes.
    #[error("chain has no nodes")]
    Empty,
}

/// Description of one node: its kind, message and the index of its cause.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub kind: ErrorKind,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cause: Option<usize>,
}

impl NodeSpec {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            cause: None,
        }
    }

    /// A node whose message is absent.
    pub fn without_message(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            cause: None,
        }
    }

    pub fn caused_by(mut self, cause: usize) -> Self {
        self.cause = Some(cause);
        self
    }
}

/// An error chain stored as a list of nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChainGraph {
    nodes: Vec<NodeSpec>,
}

impl ChainGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from node specs, checking that every cause exists.
    pub fn from_nodes(nodes: Vec<NodeSpec>) -> Result<Self, GraphError> {
        let graph = Self { nodes };
        graph.validate()?;
        Ok(graph)
    }

    /// Parses a graph from its JSON form.
    ///
    /// ```
    /// use errchain::chain::ChainGraph;
    ///
    /// let graph = ChainGraph::from_json(
    ///     r#"{"nodes": [{"message": "outer", "cause": 1}, {"kind": "sql_timeout"}]}"#,
    /// )?;
    /// assert_eq!(graph.len(), 2);
    /// # Ok::<(), errchain::chain::GraphError>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let graph: ChainGraph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Reads and parses a JSON chain file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Appends a node and returns its index.
    pub fn push(&mut self, spec: NodeSpec) -> usize {
        self.nodes.push(spec);
        self.nodes.len() - 1
    }

    /// Points `node` at `cause`.
    pub fn set_cause(&mut self, node: usize, cause: usize) -> Result<(), GraphError> {
        let len = self.nodes.len();
        if cause >= len {
            return Err(GraphError::DanglingCause { node, cause, len });
        }
        let spec = self
            .nodes
            .get_mut(node)
            .ok_or(GraphError::OutOfRange { index: node, len })?;
        spec.cause = Some(cause);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A handle to the node at `index`.
    pub fn node(&self, index: usize) -> Result<NodeRef<'_>, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }
        if index >= self.nodes.len() {
            return Err(GraphError::OutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        Ok(NodeRef { graph: self, index })
    }

    fn validate(&self) -> Result<(), GraphError> {
        let len = self.nodes.len();
        for (node, spec) in self.nodes.iter().enumerate() {
            if let Some(cause) = spec.cause {
                if cause >= len {
                    return Err(GraphError::DanglingCause { node, cause, len });
                }
            }
        }
        Ok(())
    }
}

/// A node of a [`ChainGraph`]. Its identity is its index.
#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'g> {
    graph: &'g ChainGraph,
    index: usize,
}

impl<'g> NodeRef<'g> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &'g NodeSpec {
        &self.graph.nodes[self.index]
    }
}

impl ErrorNode for NodeRef<'_> {
    fn id(&self) -> usize {
        self.index
    }

    fn message(&self) -> Option<Cow<'_, str>> {
        self.spec().message.as_deref().map(Cow::Borrowed)
    }

    fn kind(&self) -> ErrorKind {
        self.spec().kind
    }

    fn cause(&self) -> Option<Self> {
        self.spec().cause.map(|index| NodeRef {
            graph: self.graph,
            index,
        })
    }
}

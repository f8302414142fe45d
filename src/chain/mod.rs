//! Cause chain traversal
//!
//! An error chain is a singly linked list of error nodes, each optionally
//! pointing at the node that caused it. Chains handed to us by a persistence
//! layer are not always well formed: a node may name itself as its own cause,
//! and a broken wrapper can produce a longer loop. [`CauseChain`] walks a
//! chain from a starting node and stops on all of these.

pub mod graph;
pub mod std_node;

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::ErrorKind;

pub use graph::{ChainGraph, GraphError, NodeRef, NodeSpec};
pub use std_node::StdErrorNode;

/// A read-only handle to one node of an error chain.
///
/// Handles are cheap to copy. Two handles refer to the same node exactly when
/// their [`id`](ErrorNode::id) values are equal.
pub trait ErrorNode: Copy {
    /// Identity of the underlying node.
    fn id(&self) -> usize;

    /// The node's message, if it has one.
    fn message(&self) -> Option<Cow<'_, str>>;

    /// The kind tag of the node.
    fn kind(&self) -> ErrorKind;

    /// The node that caused this one.
    fn cause(&self) -> Option<Self>;
}

/// Why a traversal stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainEnd {
    /// The last node has no cause.
    Terminal,
    /// The last node names itself as its cause.
    SelfReference,
    /// The last node's cause was already visited.
    Cycle,
    /// The configured depth limit was reached before the chain ended.
    DepthLimit,
}

impl fmt::Display for ChainEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainEnd::Terminal => "terminal",
            ChainEnd::SelfReference => "self_reference",
            ChainEnd::Cycle => "cycle",
            ChainEnd::DepthLimit => "depth_limit",
        })
    }
}

/// Iterator over the nodes of a cause chain, starting node first.
///
/// Every node is yielded at most once.
#[derive(Debug)]
pub struct CauseChain<N: ErrorNode> {
    next: Option<N>,
    seen: HashSet<usize>,
    max_depth: Option<usize>,
    visited: usize,
    end: Option<ChainEnd>,
}

impl<N: ErrorNode> CauseChain<N> {
    pub fn new(start: N) -> Self {
        Self {
            next: Some(start),
            seen: HashSet::new(),
            max_depth: None,
            visited: 0,
            end: None,
        }
    }

    /// Stops after `max_depth` nodes have been yielded.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Number of nodes yielded so far.
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// How the traversal ended, once the iterator is exhausted.
    pub fn end(&self) -> Option<ChainEnd> {
        self.end
    }
}

impl<N: ErrorNode> Iterator for CauseChain<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next.take()?;

        if self.max_depth.is_some_and(|max| self.visited >= max) {
            self.end = Some(ChainEnd::DepthLimit);
            return None;
        }

        self.seen.insert(current.id());
        self.visited += 1;

        match current.cause() {
            None => self.end = Some(ChainEnd::Terminal),
            Some(cause) if cause.id() == current.id() => {
                self.end = Some(ChainEnd::SelfReference)
            }
            Some(cause) if self.seen.contains(&cause.id()) => self.end = Some(ChainEnd::Cycle),
            Some(cause) => self.next = Some(cause),
        }

        Some(current)
    }
}

/// Returns the innermost node of the chain starting at `node`.
///
/// The walk stops at a node without a cause, at a node that is its own cause,
/// or at the last new node before the chain loops back on itself.
pub fn root_cause<N: ErrorNode>(node: N) -> N {
    let mut root = node;
    for current in CauseChain::new(node) {
        root = current;
    }
    root
}

//! errchain - cause-chain diagnostics for persistence tests
//!
//! Walks an error's cause chain to find its root cause and to tell whether the
//! failure was a database lock timeout or a closed connection.
//!
//! ```
//! use errchain::chain::{ErrorNode, StdErrorNode};
//! use errchain::error::{DbError, ErrorKind};
//!
//! let err = DbError::new(ErrorKind::Generic, "could not execute update")
//!     .with_source(DbError::new(ErrorKind::LockTimeout, "Lock wait exceeded"));
//! let node = StdErrorNode::new(&err);
//!
//! assert!(errchain::is_lock_timeout(node));
//! assert!(!errchain::is_connection_close(node));
//! assert_eq!(errchain::root_cause(node).message().as_deref(), Some("Lock wait exceeded"));
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod logging;

use std::sync::OnceLock;

use chain::ErrorNode;
use error::ChainClassifier;

fn default_classifier() -> &'static ChainClassifier {
    static CLASSIFIER: OnceLock<ChainClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(ChainClassifier::new)
}

/// Returns the innermost node of the chain starting at `node`.
pub fn root_cause<N: ErrorNode>(node: N) -> N {
    chain::root_cause(node)
}

/// Returns true if the chain indicates a database lock timeout.
///
/// Uses the built-in lock kinds and keywords; nodes without a message never
/// match.
pub fn is_lock_timeout<N: ErrorNode>(node: N) -> bool {
    // The default classifier has no depth limit and skips absent messages.
    default_classifier().is_lock_timeout(node).unwrap_or(false)
}

/// Returns true if any message in the chain indicates a closed connection.
pub fn is_connection_close<N: ErrorNode>(node: N) -> bool {
    default_classifier()
        .is_connection_close(node)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainGraph, NodeSpec};
    use crate::error::ErrorKind;

    #[test]
    fn test_free_functions_on_graph() {
        let graph = ChainGraph::from_nodes(vec![
            NodeSpec::new(ErrorKind::Generic, "generic failure").caused_by(1),
            NodeSpec::new(ErrorKind::Generic, "connection is closed").caused_by(2),
            NodeSpec::without_message(ErrorKind::Generic),
        ])
        .unwrap();
        let node = graph.node(0).unwrap();

        assert!(!is_lock_timeout(node));
        assert!(is_connection_close(node));
        assert_eq!(root_cause(node).index(), 2);
    }
}

//! `ErrorNode` view over `std::error::Error` source chains

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use super::ErrorNode;
use crate::error::{DbError, ErrorKind};

/// Maps an arbitrary error to a kind tag.
pub type KindResolver = fn(&(dyn StdError + 'static)) -> ErrorKind;

/// Kind resolution used by [`StdErrorNode::new`].
///
/// `DbError` reports its own kind, an I/O error of kind `TimedOut` counts as a
/// driver timeout, everything else is generic.
pub fn default_kind(error: &(dyn StdError + 'static)) -> ErrorKind {
    if let Some(db) = error.downcast_ref::<DbError>() {
        return db.kind();
    }
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        if io.kind() == std::io::ErrorKind::TimedOut {
            return ErrorKind::SqlTimeout;
        }
    }
    ErrorKind::Generic
}

/// A node of a `source()` chain.
///
/// Identity is the address of the error value, so an error whose `source()`
/// returns itself is recognized as a self reference.
#[derive(Clone, Copy)]
pub struct StdErrorNode<'a> {
    error: &'a (dyn StdError + 'static),
    resolver: KindResolver,
}

impl<'a> StdErrorNode<'a> {
    pub fn new(error: &'a (dyn StdError + 'static)) -> Self {
        Self::with_resolver(error, default_kind)
    }

    pub fn with_resolver(error: &'a (dyn StdError + 'static), resolver: KindResolver) -> Self {
        Self { error, resolver }
    }

    pub fn error(&self) -> &'a (dyn StdError + 'static) {
        self.error
    }
}

impl fmt::Debug for StdErrorNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdErrorNode")
            .field("error", &self.error)
            .field("kind", &self.kind())
            .finish()
    }
}

impl ErrorNode for StdErrorNode<'_> {
    fn id(&self) -> usize {
        self.error as *const dyn StdError as *const () as usize
    }

    /// `DbError` may lack a message; any other error's message is its `Display`.
    fn message(&self) -> Option<Cow<'_, str>> {
        match self.error.downcast_ref::<DbError>() {
            Some(db) => db.message().map(Cow::Borrowed),
            None => Some(Cow::Owned(self.error.to_string())),
        }
    }

    fn kind(&self) -> ErrorKind {
        (self.resolver)(self.error)
    }

    fn cause(&self) -> Option<Self> {
        self.error.source().map(|source| Self {
            error: source,
            resolver: self.resolver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{root_cause, CauseChain, ChainEnd};
    use std::io;

    #[derive(Debug)]
    struct Recursive;

    impl fmt::Display for Recursive {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("wraps itself")
        }
    }

    impl StdError for Recursive {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(self)
        }
    }

    #[test]
    fn test_db_error_kind_and_message() {
        let err = DbError::new(ErrorKind::PessimisticLock, "row is locked");
        let node = StdErrorNode::new(&err);
        assert_eq!(node.kind(), ErrorKind::PessimisticLock);
        assert_eq!(node.message().as_deref(), Some("row is locked"));
    }

    #[test]
    fn test_db_error_without_message() {
        let err = DbError::without_message(ErrorKind::Generic);
        assert!(StdErrorNode::new(&err).message().is_none());
    }

    #[test]
    fn test_io_timed_out_resolves_to_sql_timeout() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "read");
        assert_eq!(StdErrorNode::new(&err).kind(), ErrorKind::SqlTimeout);

        let err = io::Error::new(io::ErrorKind::BrokenPipe, "write");
        assert_eq!(StdErrorNode::new(&err).kind(), ErrorKind::Generic);
    }

    #[test]
    fn test_custom_resolver() {
        fn everything_locks(_: &(dyn StdError + 'static)) -> ErrorKind {
            ErrorKind::LockAcquisition
        }
        let err = io::Error::new(io::ErrorKind::Other, "boom");
        let node = StdErrorNode::with_resolver(&err, everything_locks);
        assert_eq!(node.kind(), ErrorKind::LockAcquisition);
    }

    #[test]
    fn test_root_cause_of_source_chain() {
        let err = DbError::new(ErrorKind::Generic, "transaction failed").with_source(
            DbError::new(ErrorKind::LockTimeout, "lock wait timeout")
                .with_source(io::Error::new(io::ErrorKind::Other, "socket closed")),
        );

        let root = root_cause(StdErrorNode::new(&err));
        assert_eq!(root.message().as_deref(), Some("socket closed"));
        assert!(root.error().is::<io::Error>());
    }

    #[test]
    fn test_self_referential_source_terminates() {
        let err = Recursive;
        let node = StdErrorNode::new(&err);

        let mut chain = CauseChain::new(node);
        assert_eq!(chain.by_ref().count(), 1);
        assert_eq!(chain.end(), Some(ChainEnd::SelfReference));
        assert_eq!(root_cause(node).id(), node.id());
    }
}

//! Error kind tags for persistence failures
//!
//! Nodes in a cause chain are tagged with an [`ErrorKind`] instead of being
//! identified by their concrete type. The set of kinds that count as a lock
//! timeout is plain data ([`KindSet`]), so new kinds can be recognized without
//! touching traversal code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of failure a single error node represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Any failure without a more specific tag.
    #[default]
    Generic,
    /// The database refused to grant a lock.
    LockAcquisition,
    /// The persistence layer gave up waiting for a lock.
    LockTimeout,
    /// Pessimistic lock failure raised by the ORM.
    PessimisticLock,
    /// Pessimistic lock failure raised by the persistence provider API.
    ProviderPessimisticLock,
    /// Statement timeout reported by the SQL driver.
    SqlTimeout,
    /// The driver could not obtain or keep a connection.
    ConnectionFailure,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Generic,
        ErrorKind::LockAcquisition,
        ErrorKind::LockTimeout,
        ErrorKind::PessimisticLock,
        ErrorKind::ProviderPessimisticLock,
        ErrorKind::SqlTimeout,
        ErrorKind::ConnectionFailure,
    ];

    /// Returns the snake_case name used in chain files and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Generic => "generic",
            ErrorKind::LockAcquisition => "lock_acquisition",
            ErrorKind::LockTimeout => "lock_timeout",
            ErrorKind::PessimisticLock => "pessimistic_lock",
            ErrorKind::ProviderPessimisticLock => "provider_pessimistic_lock",
            ErrorKind::SqlTimeout => "sql_timeout",
            ErrorKind::ConnectionFailure => "connection_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ErrorKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A set of error kinds a classifier treats as equivalent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindSet {
    kinds: Vec<ErrorKind>,
}

impl KindSet {
    /// Creates a set from the given kinds, dropping duplicates.
    pub fn new(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        let mut set = Self { kinds: Vec::new() };
        for kind in kinds {
            set.insert(kind);
        }
        set
    }

    /// The kinds that indicate a database lock timeout.
    pub fn lock_timeout() -> Self {
        Self::new([
            ErrorKind::LockAcquisition,
            ErrorKind::LockTimeout,
            ErrorKind::PessimisticLock,
            ErrorKind::ProviderPessimisticLock,
            ErrorKind::SqlTimeout,
        ])
    }

    /// Adds a kind. Returns false if it was already present.
    pub fn insert(&mut self, kind: ErrorKind) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.kinds.push(kind);
        true
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl FromIterator<ErrorKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = ErrorKind>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_default_is_generic() {
        assert_eq!(ErrorKind::default(), ErrorKind::Generic);
    }

    #[test]
    fn test_error_kind_display_matches_serde_name() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_error_kind_from_str() {
        assert_eq!(
            "sql_timeout".parse::<ErrorKind>(),
            Ok(ErrorKind::SqlTimeout)
        );
        assert_eq!(
            "provider_pessimistic_lock".parse::<ErrorKind>(),
            Ok(ErrorKind::ProviderPessimisticLock)
        );
    }

    #[test]
    fn test_error_kind_from_str_unknown() {
        let err = "deadlock".parse::<ErrorKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown error kind: deadlock");
    }

    #[test]
    fn test_lock_timeout_set_members() {
        let set = KindSet::lock_timeout();
        assert_eq!(set.len(), 5);
        assert!(set.contains(ErrorKind::LockAcquisition));
        assert!(set.contains(ErrorKind::LockTimeout));
        assert!(set.contains(ErrorKind::PessimisticLock));
        assert!(set.contains(ErrorKind::ProviderPessimisticLock));
        assert!(set.contains(ErrorKind::SqlTimeout));
        assert!(!set.contains(ErrorKind::Generic));
        assert!(!set.contains(ErrorKind::ConnectionFailure));
    }

    #[test]
    fn test_kind_set_insert_dedupes() {
        let mut set = KindSet::new([ErrorKind::SqlTimeout, ErrorKind::SqlTimeout]);
        assert_eq!(set.len(), 1);
        assert!(!set.insert(ErrorKind::SqlTimeout));
        assert!(set.insert(ErrorKind::ConnectionFailure));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![ErrorKind::SqlTimeout, ErrorKind::ConnectionFailure]
        );
    }

    #[test]
    fn test_kind_set_empty() {
        let set: KindSet = std::iter::empty().collect();
        assert!(set.is_empty());
        assert!(!set.contains(ErrorKind::LockTimeout));
    }
}

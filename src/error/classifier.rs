//! Lock timeout and closed connection detection over cause chains
//!
//! [`ChainClassifier`] answers three questions about an error chain: what is
//! its root cause, does it indicate a database lock timeout, and does it
//! indicate a closed connection. Message checks are keyword matches compiled
//! into a single regex per question.

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::{ErrorKind, KindSet};
use crate::chain::{CauseChain, ChainEnd, ErrorNode};

/// Keywords in the origin message that indicate a lock timeout. Case-sensitive.
pub const TIMEOUT_KEYWORDS: [&str; 3] = ["timeout", "timed out", "time out"];

/// Keywords in a node's message that indicate a closed connection. Case-insensitive.
pub const CONNECTION_CLOSE_KEYWORDS: [&str; 2] = ["connection is close", "closed connection"];

/// Errors produced while classifying a chain.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A visited node had no message and the policy is [`MissingMessagePolicy::Fail`].
    #[error("node at depth {depth} has no message")]
    MissingMessage { depth: usize },

    /// The chain is longer than the configured limit.
    #[error("cause chain exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    /// A keyword list could not be compiled.
    #[error("invalid keyword pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Which message the lock timeout keyword check reads at each step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    /// Always the message of the node classification started from.
    #[default]
    Origin,
    /// The message of the node being visited.
    Current,
}

/// What to do when a node's message is needed but absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMessagePolicy {
    /// Treat the node as not matching.
    #[default]
    Skip,
    /// Abort classification with [`ClassifyError::MissingMessage`].
    Fail,
}

/// A set of keywords matched as substrings of an error message.
///
/// A case-insensitive pattern lower-cases both the keywords and the message
/// before matching, so `"connection i\u{17f} closed"` does not match
/// `"connection is close"` even though Unicode case folding would equate the
/// long s with `s`.
#[derive(Clone, Debug)]
pub struct MessagePattern {
    /// `None` when there are no keywords; such a pattern never matches.
    regex: Option<Regex>,
    keywords: Vec<String>,
    /// Keywords as they appear in the regex (lower-cased when case-insensitive).
    needles: Vec<String>,
    case_insensitive: bool,
}

impl MessagePattern {
    /// Compiles `keywords` into one pattern. Keywords are literal text.
    pub fn new<I, S>(keywords: I, case_insensitive: bool) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k| !k.is_empty())
            .collect();
        let needles: Vec<String> = keywords
            .iter()
            .map(|k| if case_insensitive { k.to_lowercase() } else { k.clone() })
            .collect();

        let regex = if needles.is_empty() {
            None
        } else {
            let alternation = needles
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        Ok(Self {
            regex,
            keywords,
            needles,
            case_insensitive,
        })
    }

    /// Returns the keyword found in `text`, if any.
    ///
    /// When several keywords occur, the one starting earliest in `text` wins.
    pub fn find(&self, text: &str) -> Option<&str> {
        let regex = self.regex.as_ref()?;
        let haystack: Cow<'_, str> = if self.case_insensitive {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };
        let found = regex.find(&haystack)?;
        self.needles
            .iter()
            .position(|needle| needle == found.as_str())
            .map(|i| self.keywords[i].as_str())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

/// Summary of one chain, as produced by [`ChainClassifier::diagnose`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainDiagnosis {
    /// Number of distinct nodes in the chain.
    pub depth: usize,
    /// How traversal of the chain ended.
    pub end: ChainEnd,
    pub root_kind: ErrorKind,
    pub root_message: Option<String>,
    pub lock_timeout: bool,
    pub connection_close: bool,
}

/// Classifies error chains as lock timeouts or closed connections.
#[derive(Clone, Debug)]
pub struct ChainClassifier {
    lock_kinds: KindSet,
    timeout_pattern: MessagePattern,
    connection_close_pattern: MessagePattern,
    message_scope: MessageScope,
    missing_message: MissingMessagePolicy,
    max_depth: Option<usize>,
}

impl Default for ChainClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainClassifier {
    /// Creates a classifier with the built-in kinds and keywords.
    pub fn new() -> Self {
        Self {
            lock_kinds: KindSet::lock_timeout(),
            timeout_pattern: MessagePattern::new(TIMEOUT_KEYWORDS, false)
                .expect("built-in timeout keywords compile"),
            connection_close_pattern: MessagePattern::new(CONNECTION_CLOSE_KEYWORDS, true)
                .expect("built-in connection keywords compile"),
            message_scope: MessageScope::default(),
            missing_message: MissingMessagePolicy::default(),
            max_depth: None,
        }
    }

    /// Replaces the set of kinds that count as a lock timeout.
    pub fn with_lock_kinds(mut self, kinds: KindSet) -> Self {
        self.lock_kinds = kinds;
        self
    }

    /// Replaces the lock timeout keywords. Matching stays case-sensitive.
    pub fn with_timeout_keywords<I, S>(mut self, keywords: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timeout_pattern = MessagePattern::new(keywords, false)?;
        Ok(self)
    }

    /// Replaces the closed connection keywords. Matching stays case-insensitive.
    pub fn with_connection_close_keywords<I, S>(
        mut self,
        keywords: I,
    ) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connection_close_pattern = MessagePattern::new(keywords, true)?;
        Ok(self)
    }

    pub fn with_message_scope(mut self, scope: MessageScope) -> Self {
        self.message_scope = scope;
        self
    }

    pub fn with_missing_message(mut self, policy: MissingMessagePolicy) -> Self {
        self.missing_message = policy;
        self
    }

    /// Limits how many nodes a single classification may visit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn lock_kinds(&self) -> &KindSet {
        &self.lock_kinds
    }

    pub fn timeout_pattern(&self) -> &MessagePattern {
        &self.timeout_pattern
    }

    pub fn connection_close_pattern(&self) -> &MessagePattern {
        &self.connection_close_pattern
    }

    pub fn message_scope(&self) -> MessageScope {
        self.message_scope
    }

    pub fn missing_message(&self) -> MissingMessagePolicy {
        self.missing_message
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns the innermost node reachable from `node`.
    pub fn root_cause<N: ErrorNode>(&self, node: N) -> Result<N, ClassifyError> {
        let mut chain = self.chain(node);
        let mut root = node;
        for current in chain.by_ref() {
            root = current;
        }
        self.check_depth(&chain)?;
        Ok(root)
    }

    /// Returns true if the chain starting at `node` indicates a lock timeout.
    ///
    /// At each visited node the node's kind is checked against the lock kinds
    /// first, then the timeout keywords are searched for. With the default
    /// [`MessageScope::Origin`], the keyword search always reads the message of
    /// `node` itself, never the visited node's message.
    pub fn is_lock_timeout<N: ErrorNode>(&self, node: N) -> Result<bool, ClassifyError> {
        let origin_message = node.message();
        let mut chain = self.chain(node);

        for (depth, current) in chain.by_ref().enumerate() {
            trace!(depth, kind = %current.kind(), "checking node for lock timeout");

            if self.lock_kinds.contains(current.kind()) {
                debug!(depth, kind = %current.kind(), "lock timeout kind matched");
                return Ok(true);
            }

            let message: Option<Cow<'_, str>> = match self.message_scope {
                MessageScope::Origin => origin_message.as_deref().map(Cow::Borrowed),
                MessageScope::Current => current.message(),
            };
            if let Some(keyword) =
                self.find_keyword(&self.timeout_pattern, message.as_deref(), depth)?
            {
                debug!(depth, keyword, "lock timeout keyword matched");
                return Ok(true);
            }
        }

        self.check_depth(&chain)?;
        Ok(false)
    }

    /// Returns true if any node's message indicates a closed connection.
    ///
    /// Each visited node's own message is lower-cased and searched for the
    /// lower-cased keywords.
    pub fn is_connection_close<N: ErrorNode>(&self, node: N) -> Result<bool, ClassifyError> {
        let mut chain = self.chain(node);

        for (depth, current) in chain.by_ref().enumerate() {
            trace!(depth, "checking node for closed connection");

            let message = current.message();
            if let Some(keyword) =
                self.find_keyword(&self.connection_close_pattern, message.as_deref(), depth)?
            {
                debug!(depth, keyword, "closed connection keyword matched");
                return Ok(true);
            }
        }

        self.check_depth(&chain)?;
        Ok(false)
    }

    /// Runs every check against the chain starting at `node`.
    pub fn diagnose<N: ErrorNode>(&self, node: N) -> Result<ChainDiagnosis, ClassifyError> {
        let mut chain = self.chain(node);
        let mut root = node;
        for current in chain.by_ref() {
            root = current;
        }
        self.check_depth(&chain)?;

        // Each predicate below walks the chain again, so a diagnosis costs three passes.
        let diagnosis = ChainDiagnosis {
            depth: chain.visited(),
            end: chain.end().unwrap_or(ChainEnd::Terminal),
            root_kind: root.kind(),
            root_message: root.message().map(Cow::into_owned),
            lock_timeout: self.is_lock_timeout(node)?,
            connection_close: self.is_connection_close(node)?,
        };
        debug!(
            depth = diagnosis.depth,
            lock_timeout = diagnosis.lock_timeout,
            connection_close = diagnosis.connection_close,
            "chain diagnosed"
        );
        Ok(diagnosis)
    }

    fn chain<N: ErrorNode>(&self, node: N) -> CauseChain<N> {
        let chain = CauseChain::new(node);
        match self.max_depth {
            Some(max) => chain.with_max_depth(max),
            None => chain,
        }
    }

    fn check_depth<N: ErrorNode>(&self, chain: &CauseChain<N>) -> Result<(), ClassifyError> {
        match (chain.end(), self.max_depth) {
            (Some(ChainEnd::DepthLimit), Some(limit)) => Err(ClassifyError::DepthExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn find_keyword<'p>(
        &self,
        pattern: &'p MessagePattern,
        message: Option<&str>,
        depth: usize,
    ) -> Result<Option<&'p str>, ClassifyError> {
        match (message, self.missing_message) {
            (Some(text), _) => Ok(pattern.find(text)),
            (None, MissingMessagePolicy::Skip) => Ok(None),
            (None, MissingMessagePolicy::Fail) => Err(ClassifyError::MissingMessage { depth }),
        }
    }
}

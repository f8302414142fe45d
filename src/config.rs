//! Classifier configuration.
//!
//! A configuration file overrides the built-in lock kinds, keywords and
//! policies of [`ChainClassifier`]. Every field is optional; omitted fields
//! keep their built-in value.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::error::{
    ChainClassifier, ClassifyError, ErrorKind, KindSet, MessageScope, MissingMessagePolicy,
    CONNECTION_CLOSE_KEYWORDS, TIMEOUT_KEYWORDS,
};

/// Prefix for environment variable overrides, e.g. `ERRCHAIN__MAX_DEPTH=64`.
pub const ENV_PREFIX: &str = "ERRCHAIN";

/// Errors that can occur when loading classifier configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration path is not valid UTF-8.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ConfigError),

    /// An in-memory TOML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for building a [`ChainClassifier`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassifierConfig {
    /// Kinds that count as a lock timeout wherever they appear in the chain
    #[serde(default = "default_lock_kinds")]
    pub lock_timeout_kinds: Vec<ErrorKind>,
    /// Case-sensitive keywords that mark a lock timeout
    #[serde(default = "default_timeout_keywords")]
    pub timeout_keywords: Vec<String>,
    /// Case-insensitive keywords that mark a closed connection
    #[serde(default = "default_connection_close_keywords")]
    pub connection_close_keywords: Vec<String>,
    /// Which message the lock timeout keyword check reads
    #[serde(default)]
    pub message_scope: MessageScope,
    /// Handling of nodes without a message
    #[serde(default)]
    pub missing_message: MissingMessagePolicy,
    /// Maximum number of nodes a classification may visit
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lock_timeout_kinds: default_lock_kinds(),
            timeout_keywords: default_timeout_keywords(),
            connection_close_keywords: default_connection_close_keywords(),
            message_scope: MessageScope::default(),
            missing_message: MissingMessagePolicy::default(),
            max_depth: None,
        }
    }
}

fn default_lock_kinds() -> Vec<ErrorKind> {
    KindSet::lock_timeout().iter().collect()
}

fn default_timeout_keywords() -> Vec<String> {
    TIMEOUT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_connection_close_keywords() -> Vec<String> {
    CONNECTION_CLOSE_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

impl ClassifierConfig {
    /// Load classifier configuration from a TOML file.
    ///
    /// Scalar settings can be overridden from the environment with the
    /// `ERRCHAIN__` prefix, e.g. `ERRCHAIN__MISSING_MESSAGE=fail`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, the path is not valid
    /// UTF-8, or the file cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use errchain::config::ClassifierConfig;
    ///
    /// let config = ClassifierConfig::load("errchain.toml")?;
    /// let classifier = config.build()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigLoadError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::with_name(path_str))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Build a classifier from these settings.
    pub fn build(&self) -> Result<ChainClassifier, ClassifyError> {
        let mut classifier = ChainClassifier::new()
            .with_lock_kinds(self.lock_timeout_kinds.iter().copied().collect())
            .with_timeout_keywords(self.timeout_keywords.iter().cloned())?
            .with_connection_close_keywords(self.connection_close_keywords.iter().cloned())?
            .with_message_scope(self.message_scope)
            .with_missing_message(self.missing_message);
        if let Some(max_depth) = self.max_depth {
            classifier = classifier.with_max_depth(max_depth);
        }
        Ok(classifier)
    }
}

//! Process-level engine configuration, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```toml
//! depth = 8
//! threads = 4
//! opening_book = "tables/openings.tsv"
//! deadline_polling = { every_nodes = 4096 }
//!
//! [pruning]
//! null_move = false
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::iterative_deepening::{ParallelConfig, PruningConfig, SearchConfig};
use crate::search::search_control::DeadlinePolling;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub depth: u8,
    pub movetime_ms: Option<u64>,
    pub max_nodes: Option<u64>,
    /// Total search threads; 1 means no worker pool.
    pub threads: usize,
    pub hash_mb: usize,
    /// Opening book file. `.csv` is read as the hash-keyed format.
    pub opening_book: Option<PathBuf>,
    /// Fall back to the built-in book when no file is given.
    pub embedded_book: bool,
    /// Smallest requested depth at which the book is consulted.
    pub opening_min_depth: u8,
    pub endgame_table: Option<PathBuf>,
    pub deadline_polling: DeadlinePolling,
    pub pruning: PruningConfig,
    pub parallel: ParallelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: 6,
            movetime_ms: None,
            max_nodes: None,
            threads: 1,
            hash_mb: 64,
            opening_book: None,
            embedded_book: true,
            opening_min_depth: 3,
            endgame_table: None,
            deadline_polling: DeadlinePolling::RootMoves,
            pruning: PruningConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".to_owned()));
        }
        if self.hash_mb == 0 {
            return Err(ConfigError::Invalid("hash_mb must be at least 1".to_owned()));
        }
        if matches!(self.deadline_polling, DeadlinePolling::EveryNodes(0)) {
            return Err(ConfigError::Invalid("every_nodes interval must be positive".to_owned()));
        }
        Ok(())
    }

    /// Per-search settings derived from this configuration.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_depth: self.depth,
            movetime_ms: self.movetime_ms,
            max_nodes: self.max_nodes,
            stop_flag: None,
            deadline_polling: self.deadline_polling,
            pruning: self.pruning,
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ConfigError, EngineConfig};
    use crate::search::search_control::DeadlinePolling;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.opening_min_depth, 3);
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let text = r#"
            depth = 9
            threads = 4
            movetime_ms = 1500
            opening_book = "tables/openings.csv"
            deadline_polling = { every_nodes = 4096 }

            [pruning]
            null_move = false

            [parallel]
            min_split_depth = 6
        "#;
        let config = EngineConfig::from_toml_str(text).expect("config should parse");
        assert_eq!(config.depth, 9);
        assert_eq!(config.threads, 4);
        assert_eq!(config.movetime_ms, Some(1500));
        assert_eq!(config.opening_book, Some(PathBuf::from("tables/openings.csv")));
        assert_eq!(config.deadline_polling, DeadlinePolling::EveryNodes(4096));
        assert!(!config.pruning.null_move);
        assert!(config.pruning.futility);
        assert_eq!(config.parallel.min_split_depth, 6);
        assert_eq!(config.parallel.min_split_siblings, 3);

        let search = config.search_config();
        assert_eq!(search.max_depth, 9);
        assert_eq!(search.movetime_ms, Some(1500));
        assert!(!search.pruning.null_move);
    }

    #[test]
    fn root_polling_is_spelled_as_a_string() {
        let config = EngineConfig::from_toml_str("deadline_polling = \"root_moves\"").expect("config should parse");
        assert_eq!(config.deadline_polling, DeadlinePolling::RootMoves);
    }

    #[test]
    fn bad_documents_are_rejected() {
        assert!(matches!(EngineConfig::from_toml_str("depth = \"deep\""), Err(ConfigError::Parse(_))));
        assert!(matches!(EngineConfig::from_toml_str("colour = \"white\""), Err(ConfigError::Parse(_))));
        assert!(matches!(EngineConfig::from_toml_str("threads = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            EngineConfig::from_path("/nonexistent/quince.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}

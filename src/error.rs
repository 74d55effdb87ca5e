//! Error type shared by the finder stages.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by the track finder.
///
/// Malformed hits are not errors: they are flagged as background and the
/// event continues. An empty result is not an error either.
#[derive(Debug, Error)]
pub enum FinderError {
    /// A configuration value violates its contract; no finder is built.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The relation graph handed to the path finder is not acyclic.
    #[error("relation graph has a cycle through {remaining} of {nodes} nodes")]
    RelationCycle { remaining: usize, nodes: usize },
    /// A node already taken in this pass was harvested again.
    #[error("automaton cell {index} harvested while already taken")]
    CellReused { index: usize },
    /// The per-event time budget ran out.
    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FinderError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FinderError::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;

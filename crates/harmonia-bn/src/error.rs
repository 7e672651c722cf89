//! Error types for network construction, estimation and search.

use thiserror::Error;

/// Errors that can occur while building, scoring or searching networks.
#[derive(Error, Debug)]
pub enum BnError {
    /// An edge or lookup referenced a node that is not in the network.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node label was added twice.
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// The requested structure is not a valid network.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Two networks were compared before both had been scored.
    #[error("Cannot compare networks that have not been scored")]
    UnscoredComparison,

    /// A dataset cell is outside its column's state range.
    #[error("Invalid state {value} at row {row} for node '{node}' ({nstates} states)")]
    InvalidState {
        node: String,
        row: usize,
        value: usize,
        nstates: usize,
    },

    /// Shapes of arrays or datasets do not line up.
    #[error("Dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// A node has no conditional probability table yet.
    #[error("No CPT has been estimated for node '{0}'")]
    MissingCpt(String),

    /// A node's CPT was computed for a different parent set.
    #[error("CPT for node '{0}' is stale: parents changed since it was estimated")]
    StaleCpt(String),

    /// Search parameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Filesystem error while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, BnError>;

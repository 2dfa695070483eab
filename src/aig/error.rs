use thiserror::Error;

use super::NodeId;

/// The result of an AIG operation.
pub type Result<T> = std::result::Result<T, AigError>;

/// Error returned when an AIG operation failed.
#[derive(Debug, Error)]
pub enum AigError {
    /// A different node with the given id already exists.
    #[error("a different node with id={0} already exists")]
    DuplicateId(NodeId),

    /// The id 0 is reserved for the `False` constant node only.
    #[error("id=0 is for node False only")]
    IdZeroButNotFalse,

    /// The node with given id does not exist.
    #[error("node with id={0} does not exist")]
    NodeDoesNotExist(NodeId),

    /// A node is used as a fanin but was never defined.
    #[error("node {0} is referenced but never defined")]
    UndefinedNode(NodeId),

    /// Simulation needs exactly one word per primary input.
    #[error("expected {expected} input words, got {got}")]
    InputWidth { expected: usize, got: usize },

    /// Invalid operation on a node which does not have such specified fanin.
    /// Outputs only have [`FaninId::Fanin0`].
    ///
    /// [`FaninId::Fanin0`]: crate::FaninId::Fanin0
    #[error("the node has no such fanin")]
    NoFanin,

    /// The AIG has reached an invalid state. This should never happen.
    /// For example, a fanin without the matching fanout back-reference.
    #[error("the AIG has reached an invalid state - this should not happen - error: {0}")]
    InvalidState(String),

    /// Just forwarding a [`ParserError`].
    #[error("{0}")]
    ParserError(#[from] ParserError),

    /// Just forwarding a [`PatternError`].
    #[error("{0}")]
    PatternError(#[from] PatternError),

    /// The SAT solver gave up.
    #[error("sat solver error: {0}")]
    SolverError(#[from] varisat::solver::SolverError),

    /// Writing a netlist or a simulation log failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned when parsing from file failed.
///
/// It is defined here because the `parser` module is private.
#[derive(Debug, Error)]
pub enum ParserError {
    /// All features are not supported (only the basics in fact).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Invalid token, something else was expected.
    #[error("line {line}: invalid token: {msg}")]
    InvalidToken { line: usize, msg: String },

    /// An IO error occured (file doesn't exist, or doesn't have the right extension, ...).
    #[error("io error: {0}")]
    IoError(String),
}

/// Error returned when a simulation pattern file is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error(
        "Pattern({pattern}) length({}) does not match the number of inputs({expected}) in a circuit!!",
        .pattern.len()
    )]
    WidthMismatch { pattern: String, expected: usize },

    #[error("Pattern({pattern}) contains a non-0/1 character('{found}').")]
    InvalidCharacter { pattern: String, found: char },
}

use combopt_model::ModelError;
use thiserror::Error;

/// Structurally bad source data, caught before any model is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedInputError {
    #[error("Declared {declared} {what} but found {found}")]
    CountMismatch {
        what: &'static str,
        declared: usize,
        found: usize,
    },
    #[error("Edge {edge} references node {node}, but the graph has {nodes} nodes")]
    EndpointOutOfRange { edge: usize, node: usize, nodes: usize },
    #[error("Node id {id} is out of range for {nodes} nodes")]
    NodeIdOutOfRange { id: usize, nodes: usize },
    #[error("Node id {0} appears more than once")]
    DuplicateNodeId(usize),
    #[error("Non-finite weight on {0}")]
    NonFiniteWeight(String),
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Unexpected end of input: expected {0}")]
    UnexpectedEof(String),
}

/// Problem parameters that do not fit together.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInstanceError {
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("{what} index {index} is out of range (0..{len})")]
    IndexOutOfRange { what: String, index: usize, len: usize },
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl InvalidInstanceError {
    pub(crate) fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        InvalidInstanceError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    pub(crate) fn index(what: impl Into<String>, index: usize, len: usize) -> Self {
        InvalidInstanceError::IndexOutOfRange {
            what: what.into(),
            index,
            len,
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        InvalidInstanceError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Reject a vector whose length differs from the expected dimension.
pub(crate) fn expect_len<T>(what: &str, values: &[T], expected: usize) -> Result<(), InvalidInstanceError> {
    if values.len() != expected {
        return Err(InvalidInstanceError::dimension(what, expected, values.len()));
    }
    Ok(())
}

/// Reject negative or non-finite entries.
pub(crate) fn expect_non_negative(name: &'static str, values: &[f64]) -> Result<(), InvalidInstanceError> {
    match values.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(i) => Err(InvalidInstanceError::parameter(
            name,
            format!("entry {} is {}, expected a finite non-negative number", i, values[i]),
        )),
        None => Ok(()),
    }
}

/// Reject non-finite entries.
pub(crate) fn expect_finite(name: &'static str, values: &[f64]) -> Result<(), InvalidInstanceError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(InvalidInstanceError::parameter(name, format!("entry {} is {}", i, values[i]))),
        None => Ok(()),
    }
}

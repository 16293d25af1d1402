//! This module contains all custom errors used in this library.

use std::fmt;
use std::error::Error;

#[derive(Debug)]
pub enum ImportError {
    IoError(std::io::Error),
    /// Holds the line number and the content of the offending line.
    InputMalformedError(usize, String),
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> ImportError {
        ImportError::IoError(e)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "Import: IoError ({})", e),
            Self::InputMalformedError(line, content) => write!(f, "Import: Line {} is malformed: {:?}", line, content),
        }
    }
}

impl Error for ImportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    InvalidParameter(String),
    GraphError(String),
    /// The deadline of the current solve call expired.
    OutOfTime,
    /// The interrupt token was set from the outside.
    Interrupted,
    InvalidSolution(String),
}

impl ProcessingError {
    /// Returns `true` for the errors that abort a search without indicating a bug.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::OutOfTime | Self::Interrupted)
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::GraphError(msg) => write!(f, "Graph error: {}", msg),
            Self::OutOfTime => write!(f, "No solution found within the time budget"),
            Self::Interrupted => write!(f, "Search was interrupted"),
            Self::InvalidSolution(msg) => write!(f, "InvalidSolution: {}", msg),
        }
    }
}

impl Error for ProcessingError {}

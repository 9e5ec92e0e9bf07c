use thiserror::Error;

use crate::zones::constraint::Limit;

/// Errors for malformed input handed to the zone operations. An empty zone
/// is not an error, it is the `Unsafe` state of a DBM.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DbmError {
    #[error("limit {limit} cannot be encoded without overflowing")]
    Overflow { limit: Limit },
    #[error("{len} relations do not form a square matrix")]
    NotSquare { len: usize },
    #[error("expected dimension {expected} but found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("a DBM needs at least the reference clock")]
    EmptyUniverse,
}

pub type Result<T> = std::result::Result<T, DbmError>;

//! Error taxonomy.
//!
//! `ConfigError` and `BoundsError` are fatal and raised before any state is
//! touched. `NumericalError` and `TraceError` are scoped to a single edge and
//! travel inside that edge's `PathRecord` as an `EdgeError`.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Cell;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cellsize must be finite and > 0, got {0}")]
    Cellsize(f64),
    #[error("weight must lie in [0, 1], got {0}")]
    Weight(f64),
    #[error("slope polynomial coefficient {index} is not finite")]
    Coefficient { index: usize },
    #[error("invalid simulation parameter `{name}`: {reason}")]
    Parameter { name: &'static str, reason: String },
    #[error("grid `{name}` is {actual:?}, expected {expected:?}")]
    Shape {
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("grid `{name}` holds {actual} values, expected {expected}")]
    DataLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("elevation grid is empty")]
    EmptyGrid,
    #[error("net cost must be finite and >= 0 at {cell:?}")]
    NetCost { cell: Cell },
    #[error("duplicate point id {0}")]
    DuplicatePoint(i64),
    #[error("edge {edge} references unknown point id {id}")]
    UnknownPoint { edge: usize, id: i64 },
    #[error("slope polynomial fit needs at least 5 samples, got {0}")]
    TooFewSamples(usize),
    #[error("slope polynomial fit is singular")]
    SingularFit,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cell {cell:?} lies outside the {rows}x{cols} grid")]
pub struct BoundsError {
    /// Point id, when the cell came from the point table.
    pub id: Option<i64>,
    pub cell: (i64, i64),
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum NumericalError {
    #[error("non-finite elevation at {cell:?}")]
    NonFiniteElevation { cell: Cell },
    #[error("non-finite accumulated cost at {cell:?}")]
    NonFiniteCost { cell: Cell },
    #[error("distance transform did not converge within {pairs} sweep pairs (last change {last_change})")]
    NotConverged { pairs: usize, last_change: f64 },
    #[error("seed grid is {seed:?} but the cost field is {field:?}")]
    SeedShape {
        seed: (usize, usize),
        field: (usize, usize),
    },
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum TraceError {
    #[error("backlinks from {destination:?} did not reach a source within {limit} steps")]
    Cycle { destination: Cell, limit: usize },
    #[error("{destination:?} is not reachable from {origin:?}")]
    Unreachable { origin: Cell, destination: Cell },
    #[error("backlink chain leaves the grid at {cell:?}")]
    OutsideGrid { cell: (i64, i64) },
}

/// Failure of a single edge; recorded on its `PathRecord`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum EdgeError {
    #[error(transparent)]
    Numerical(#[from] NumericalError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("bounds error: {0}")]
    Bounds(#[from] BoundsError),
    #[error("numerical error: {0}")]
    Numerical(#[from] NumericalError),
    #[error("trace error: {0}")]
    Trace(#[from] TraceError),
}

impl From<EdgeError> for Error {
    fn from(e: EdgeError) -> Self {
        match e {
            EdgeError::Numerical(e) => Error::Numerical(e),
            EdgeError::Trace(e) => Error::Trace(e),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Point table, ordered edge list and per-edge path records.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BoundsError, ConfigError, EdgeError, Error};
use crate::grid::{Cell, Grid};

/// A location with a unique id, already converted to raster row/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub id: i64,
    /// Signed so out-of-grid input can be reported rather than wrapped.
    pub r: i64,
    pub c: i64,
}

/// Directed origin → destination pair. Order in the edge list matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub origin: i64,
    pub destination: i64,
}

impl Edge {
    pub fn new(origin: i64, destination: i64) -> Self {
        Self { origin, destination }
    }
}

/// Result of one edge: the rasterized route, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub id: usize,
    pub origin: Cell,
    pub destination: Cell,
    /// Origin → destination inclusive, 8-connected. Empty on failure.
    pub track: Vec<Cell>,
    pub failure: Option<EdgeError>,
}

impl PathRecord {
    pub fn failed(id: usize, origin: Cell, destination: Cell, err: EdgeError) -> Self {
        Self {
            id,
            origin,
            destination,
            track: Vec::new(),
            failure: Some(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    /// Binary raster of the track.
    pub fn rasterize(&self, rows: usize, cols: usize) -> Grid<u8> {
        let mut g = Grid::new(rows, cols, 0u8);
        self.mark(&mut g);
        g
    }

    /// Set every track cell of `g` to 1 (OR, not sum).
    pub fn mark(&self, g: &mut Grid<u8>) {
        for &(r, c) in &self.track {
            g.set(r, c, 1);
        }
    }
}

/// Id → cell lookup, validated against a grid shape.
#[derive(Debug, Clone)]
pub struct PointTable {
    cells: HashMap<i64, Cell>,
}

impl PointTable {
    /// Fails on duplicate ids or points outside `rows × cols`.
    pub fn new(points: &[Point], rows: usize, cols: usize) -> Result<Self, Error> {
        let mut cells = HashMap::with_capacity(points.len());
        for p in points {
            let inside = p.r >= 0 && p.c >= 0 && (p.r as usize) < rows && (p.c as usize) < cols;
            if !inside {
                return Err(BoundsError {
                    id: Some(p.id),
                    cell: (p.r, p.c),
                    rows,
                    cols,
                }
                .into());
            }
            if cells.insert(p.id, (p.r as usize, p.c as usize)).is_some() {
                return Err(ConfigError::DuplicatePoint(p.id).into());
            }
        }
        Ok(Self { cells })
    }

    pub fn get(&self, id: i64) -> Option<Cell> {
        self.cells.get(&id).copied()
    }

    /// Resolve every edge to `(origin, destination)` cells, in order.
    pub fn resolve(&self, edges: &[Edge]) -> Result<Vec<(Cell, Cell)>, ConfigError> {
        edges
            .iter()
            .enumerate()
            .map(|(k, e)| {
                let lookup = |id: i64| self.get(id).ok_or(ConfigError::UnknownPoint { edge: k, id });
                Ok((lookup(e.origin)?, lookup(e.destination)?))
            })
            .collect()
    }
}

//! Ground-potential simulation: runs the ordered edge list through
//! transform → trace → accumulate → net-cost rewrite, one edge at a time.
//!
//! Per edge k:
//!   1. Seed acs with the origin at 0.
//!   2. Distance transform over the current `CostField`.
//!   3. Trace the destination; rasterize into the single-edge grid P_k.
//!   4. `paths += P_k`.
//!   5. `Gt = Gt − Gt/T + P_k · i · (1 − Gt/Gmax)`.
//!   6. Hot cells `Gt ≥ 1`; unweighted distance d to them;
//!      `netcost = 1 − exp(d / alpha)`.
//!
//! Steps 1–3 and the new Gt/netcost are computed before anything is written,
//! so a failing edge leaves every accumulator untouched. Edges are strictly
//! sequential: each one sees the net cost left by the previous one.
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{EdgeErrorPolicy, SimulationConfig};
use crate::cost::CostField;
use crate::error::{BoundsError, ConfigError, EdgeError, Error};
use crate::grid::{Cell, Grid};
use crate::network::{Edge, PathRecord, Point, PointTable};
use crate::trace::trace;
use crate::transform::{distance_to_mask, seed, transform};

/// Ground potential at or above this marks a cell as part of the network.
pub const HOT_THRESHOLD: f64 = 1.0;

// ── Public structs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Stopped at the failed edge with this index.
    Aborted { edge: usize },
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Final ground potential Gt, in `[0, Gmax]`.
    pub ground_potential: Grid<f64>,
    /// Number of edges whose path crossed each cell.
    pub paths: Grid<u32>,
    /// One record per processed edge, in edge order.
    pub records: Vec<PathRecord>,
    pub outcome: RunOutcome,
}

/// Everything one successful edge will write, computed up front.
struct EdgeUpdate {
    record: PathRecord,
    path: Grid<u8>,
    ground_potential: Grid<f64>,
    netcost: Grid<f64>,
    sweep_pairs: usize,
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Accumulators that persist across edges. The `CostField` is passed in to
/// each `step` rather than owned, so callers keep control of it between edges.
#[derive(Debug, Clone)]
pub struct GroundPotentialSimulator {
    config: SimulationConfig,
    ground_potential: Grid<f64>,
    paths: Grid<u32>,
    records: Vec<PathRecord>,
}

impl GroundPotentialSimulator {
    pub fn new(config: SimulationConfig, rows: usize, cols: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ground_potential: Grid::new(rows, cols, 0.0),
            paths: Grid::new(rows, cols, 0),
            records: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn ground_potential(&self) -> &Grid<f64> {
        &self.ground_potential
    }

    pub fn paths(&self) -> &Grid<u32> {
        &self.paths
    }

    pub fn records(&self) -> &[PathRecord] {
        &self.records
    }

    /// Process the next edge.
    ///
    /// Shape or bounds problems are returned as `Err` before anything
    /// changes. A numerical or trace failure is not an `Err`: it comes back as
    /// the record's `failure`, and no accumulator or net cost is touched.
    pub fn step(
        &mut self,
        cost: &mut CostField,
        origin: Cell,
        destination: Cell,
    ) -> Result<&PathRecord, Error> {
        let (rows, cols) = self.ground_potential.shape();
        if cost.dem().shape() != (rows, cols) {
            return Err(ConfigError::Shape {
                name: "dem",
                expected: (rows, cols),
                actual: cost.dem().shape(),
            }
            .into());
        }
        for cell in [origin, destination] {
            if !self.ground_potential.contains(cell) {
                return Err(BoundsError {
                    id: None,
                    cell: (cell.0 as i64, cell.1 as i64),
                    rows,
                    cols,
                }
                .into());
            }
        }

        let id = self.records.len();
        match self.compute(cost, origin, destination, id) {
            Ok(update) => {
                cost.replace_netcost(update.netcost)?;
                for (total, &p) in self.paths.data.iter_mut().zip(&update.path.data) {
                    *total += p as u32;
                }
                self.ground_potential = update.ground_potential;
                info!(
                    edge = id,
                    cells = update.record.track.len(),
                    sweep_pairs = update.sweep_pairs,
                    "edge traced"
                );
                self.records.push(update.record);
            }
            Err(e) => {
                warn!(edge = id, ?origin, ?destination, error = %e, "edge failed");
                self.records.push(PathRecord::failed(id, origin, destination, e));
            }
        }
        Ok(&self.records[id])
    }

    /// Consume the simulator, yielding its accumulators.
    pub fn finish(self, outcome: RunOutcome) -> SimulationOutput {
        SimulationOutput {
            ground_potential: self.ground_potential,
            paths: self.paths,
            records: self.records,
            outcome,
        }
    }

    fn compute(
        &self,
        cost: &CostField,
        origin: Cell,
        destination: Cell,
        id: usize,
    ) -> Result<EdgeUpdate, EdgeError> {
        let (rows, cols) = self.ground_potential.shape();
        let cap = self.config.sweep_cap(rows, cols);

        let surface = transform(seed(rows, cols, &[origin]), cost, cap)?;
        let record = trace(&surface.blx, &surface.bly, origin, destination, id)?;
        let path = record.rasterize(rows, cols);

        let ground_potential = grow_potential(&self.ground_potential, &path, &self.config);
        let hot = ground_potential.map(|g| g >= HOT_THRESHOLD);
        let distance = distance_to_mask(&hot, cost.cellsize(), cap)?;
        let netcost = netcost_from_distance(&distance, self.config.alpha);

        Ok(EdgeUpdate {
            record,
            path,
            ground_potential,
            netcost,
            sweep_pairs: surface.sweep_pairs,
        })
    }
}

// ── Per-cell updates ──────────────────────────────────────────────────────────

#[inline]
fn potential_cell(g: f64, p: u8, config: &SimulationConfig) -> f64 {
    let grown = g - g / config.decay + p as f64 * config.intensity * (1.0 - g / config.g_max);
    // Clamp only absorbs rounding; validated parameters keep the exact value
    // inside [0, Gmax].
    grown.clamp(0.0, config.g_max)
}

fn grow_potential(gt: &Grid<f64>, path: &Grid<u8>, config: &SimulationConfig) -> Grid<f64> {
    let mut next = gt.clone();

    #[cfg(feature = "threading")]
    {
        next.data
            .par_iter_mut()
            .zip(path.data.par_iter())
            .for_each(|(g, &p)| *g = potential_cell(*g, p, config));
    }

    #[cfg(not(feature = "threading"))]
    {
        for (g, &p) in next.data.iter_mut().zip(&path.data) {
            *g = potential_cell(*g, p, config);
        }
    }

    next
}

fn netcost_from_distance(distance: &Grid<f64>, alpha: f64) -> Grid<f64> {
    let mut netcost = distance.clone();

    #[cfg(feature = "threading")]
    {
        netcost
            .data
            .par_iter_mut()
            .for_each(|v| *v = 1.0 - (*v / alpha).exp());
    }

    #[cfg(not(feature = "threading"))]
    {
        for v in &mut netcost.data {
            *v = 1.0 - (*v / alpha).exp();
        }
    }

    netcost
}

// ── Full run ──────────────────────────────────────────────────────────────────

/// Run every edge in order against `cost`.
///
/// Points, edges and configuration are validated before the first edge; any
/// problem there returns `Err` with `cost` untouched. A failing edge either
/// stops the run (`EdgeErrorPolicy::Abort`, reported as
/// `RunOutcome::Aborted`) or is recorded and passed over
/// (`EdgeErrorPolicy::Skip`).
pub fn simulate(
    points: &[Point],
    edges: &[Edge],
    cost: &mut CostField,
    config: &SimulationConfig,
) -> Result<SimulationOutput, Error> {
    config.validate()?;
    let (rows, cols) = cost.dem().shape();
    let table = PointTable::new(points, rows, cols)?;
    let resolved = table.resolve(edges)?;

    let mut sim = GroundPotentialSimulator::new(config.clone(), rows, cols)?;
    let mut outcome = RunOutcome::Completed;
    let mut failed = 0usize;

    for (k, (origin, destination)) in resolved.into_iter().enumerate() {
        let ok = sim.step(cost, origin, destination)?.is_ok();
        if ok {
            continue;
        }
        failed += 1;
        if config.on_edge_error == EdgeErrorPolicy::Abort {
            outcome = RunOutcome::Aborted { edge: k };
            break;
        }
    }

    info!(
        edges = edges.len(),
        processed = sim.records().len(),
        failed,
        ?outcome,
        "simulation finished"
    );
    Ok(sim.finish(outcome))
}

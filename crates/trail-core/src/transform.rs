//! Influence-weighted chamfer distance transform.
//!
//! Alternating raster sweeps over the 5×5 chamfer window:
//!   1. Forward sweep, row-major, relaxing each cell from `chamfer::FORWARD`
//!      predecessors (cells already visited in this sweep).
//!   2. Backward sweep, reverse row-major, relaxing from `chamfer::BACKWARD`.
//!   3. Repeat until no cell's value moved by `CONVERGENCE_THRESHOLD` or more
//!      between the start and the end of a forward+backward pair.
//!
//! Each relaxation is `acs[n] + step_cost(x, n, base)`; on improvement the
//! backlink at `x` records the offset to `n`. Cost is
//! O(pairs × cells × 8). Under non-uniform step costs the fixed double sweep
//! can need several pairs to propagate around obstacles, so the pair count
//! is capped and exceeding the cap is an error rather than a partial result.
use tracing::debug;

use crate::chamfer::{Step, BACKWARD, CONVERGENCE_THRESHOLD, FORWARD, UNREACHED};
use crate::cost::{StepCost, UniformCost};
use crate::error::NumericalError;
use crate::grid::{Cell, Grid};

/// Converged accumulated-cost surface plus backlinks.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSurface {
    /// Accumulated cost; 0 at sources, `UNREACHED` where no source reaches.
    pub acs: Grid<f64>,
    /// Row offset to the predecessor; 0 at sources and unreached cells.
    pub blx: Grid<i8>,
    /// Column offset to the predecessor.
    pub bly: Grid<i8>,
    /// Forward+backward pairs run before convergence.
    pub sweep_pairs: usize,
}

impl DistanceSurface {
    /// Backlink offset `(dr, dc)` stored at `cell`.
    pub fn backlink(&self, cell: Cell) -> (i8, i8) {
        (self.blx.at(cell), self.bly.at(cell))
    }
}

/// Seed grid: `sources` at 0, everything else `UNREACHED`.
pub fn seed(rows: usize, cols: usize, sources: &[Cell]) -> Grid<f64> {
    let mut acs = Grid::new(rows, cols, UNREACHED);
    for &(r, c) in sources {
        acs.set(r, c, 0.0);
    }
    acs
}

/// Run the distance transform from `seed` over `cost`.
pub fn transform<C: StepCost + ?Sized>(
    seed: Grid<f64>,
    cost: &C,
    max_pairs: usize,
) -> Result<DistanceSurface, NumericalError> {
    if seed.shape() != cost.shape() || seed.data.len() != seed.rows * seed.cols {
        return Err(NumericalError::SeedShape {
            seed: seed.shape(),
            field: cost.shape(),
        });
    }
    cost.check_finite()?;
    if let Some(i) = seed.data.iter().position(|v| !v.is_finite()) {
        return Err(NumericalError::NonFiniteCost {
            cell: (i / seed.cols, i % seed.cols),
        });
    }

    let (rows, cols) = seed.shape();
    let mut surface = DistanceSurface {
        acs: seed,
        blx: Grid::new(rows, cols, 0),
        bly: Grid::new(rows, cols, 0),
        sweep_pairs: 0,
    };

    let mut last_change = f64::INFINITY;
    let mut start = surface.acs.data.clone();
    for pair in 1..=max_pairs {
        start.copy_from_slice(&surface.acs.data);
        sweep(&mut surface, cost, &FORWARD, true)?;
        sweep(&mut surface, cost, &BACKWARD, false)?;
        // Values only ever decrease, so the pair change is start − end.
        last_change = start
            .iter()
            .zip(&surface.acs.data)
            .fold(0.0f64, |m, (a, b)| m.max(a - b));
        surface.sweep_pairs = pair;
        debug!(pair, max_change = last_change, "distance transform sweep pair");
        if last_change < CONVERGENCE_THRESHOLD {
            return Ok(surface);
        }
    }

    Err(NumericalError::NotConverged {
        pairs: max_pairs,
        last_change,
    })
}

/// Unweighted (geometric) distance from every `true` cell of `mask`.
pub fn distance_to_mask(
    mask: &Grid<bool>,
    cellsize: f64,
    max_pairs: usize,
) -> Result<Grid<f64>, NumericalError> {
    let seed = mask.map(|hot| if hot { 0.0 } else { UNREACHED });
    let cost = UniformCost {
        rows: mask.rows,
        cols: mask.cols,
        cellsize,
    };
    Ok(transform(seed, &cost, max_pairs)?.acs)
}

/// One raster pass.
fn sweep<C: StepCost + ?Sized>(
    surface: &mut DistanceSurface,
    cost: &C,
    window: &[Step; 8],
    forward: bool,
) -> Result<(), NumericalError> {
    let (rows, cols) = surface.acs.shape();
    let n = rows * cols;

    for k in 0..n {
        let i = if forward { k } else { n - 1 - k };
        let x = (i / cols, i % cols);
        if !cost.is_active(x) {
            continue;
        }

        let mut best = surface.acs.data[i];
        let mut link = None;
        for step in window {
            let Some(pred) = surface.acs.offset(x, step.dr as isize, step.dc as isize) else {
                continue;
            };
            if !cost.is_active(pred) {
                continue;
            }
            // Knight jumps must not hop over an inactive cell; the midpoint is
            // the cell the tracer will rasterize between x and pred.
            if step.dr.abs() + step.dc.abs() == 3 {
                let mid = (
                    x.0.wrapping_add_signed((step.dr / 2) as isize),
                    x.1.wrapping_add_signed((step.dc / 2) as isize),
                );
                if !cost.is_active(mid) {
                    continue;
                }
            }
            let candidate = surface.acs.at(pred) + cost.step_cost(x, pred, step.base);
            if !candidate.is_finite() {
                return Err(NumericalError::NonFiniteCost { cell: x });
            }
            if candidate < best {
                best = candidate;
                link = Some(step);
            }
        }

        if let Some(step) = link {
            surface.acs.data[i] = best;
            surface.blx.data[i] = step.dr;
            surface.bly.data[i] = step.dc;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chamfer::{DIAGONAL, ORTHOGONAL};
    use crate::config::{default_sweep_cap, CostConfig};
    use crate::cost::CostField;
    use crate::line::chebyshev;
    use approx::assert_relative_eq;

    fn flat_field(rows: usize, cols: usize) -> CostField {
        CostField::new(Grid::new(rows, cols, 0.0), &CostConfig::default()).unwrap()
    }

    fn run(field: &CostField, sources: &[Cell]) -> DistanceSurface {
        let (rows, cols) = field.dem().shape();
        transform(seed(rows, cols, sources), field, default_sweep_cap(rows, cols)).unwrap()
    }

    /// Gentle hills so terrain cost varies from cell to cell.
    fn hills(rows: usize, cols: usize) -> Grid<f64> {
        let mut g = Grid::new(rows, cols, 0.0);
        for r in 0..rows {
            for c in 0..cols {
                g.set(r, c, (r as f64 * 0.7).sin() * 0.4 + (c as f64 * 0.45).cos() * 0.3);
            }
        }
        g
    }

    #[test]
    fn sources_stay_at_zero() {
        let field = flat_field(6, 7);
        let s = run(&field, &[(0, 0), (5, 6)]);
        assert_eq!(s.acs.get(0, 0), 0.0);
        assert_eq!(s.acs.get(5, 6), 0.0);
        assert_eq!(s.backlink((0, 0)), (0, 0));
        assert_eq!(s.backlink((5, 6)), (0, 0));
        assert!(s.acs.data.iter().all(|&v| v < UNREACHED));
    }

    #[test]
    fn flat_diagonal_chain_approaches_source() {
        let field = flat_field(5, 5);
        let s = run(&field, &[(0, 0)]);
        assert_relative_eq!(s.acs.get(4, 4), 4.0 * DIAGONAL, epsilon = 1e-9);
        assert_relative_eq!(s.acs.get(0, 4), 4.0 * ORTHOGONAL, epsilon = 1e-9);

        let mut cell = (4, 4);
        let mut dist = chebyshev(cell, (0, 0));
        while s.backlink(cell) != (0, 0) {
            let (dr, dc) = s.backlink(cell);
            cell = s.acs.offset(cell, dr as isize, dc as isize).unwrap();
            let next = chebyshev(cell, (0, 0));
            assert!(next < dist, "backlink chain must approach the source");
            dist = next;
        }
        assert_eq!(cell, (0, 0));
    }

    #[test]
    fn accumulated_cost_bounded_by_explicit_paths() {
        let config = CostConfig {
            coef: [0.0, 3.0, 0.0, 1.0, 1.0],
            ..CostConfig::default()
        };
        let field = CostField::new(hills(9, 12), &config).unwrap();
        let s = run(&field, &[(0, 0)]);

        // Straight east along row 0.
        let mut along = 0.0;
        for c in 1..12 {
            along += field.step_cost((0, c), (0, c - 1), ORTHOGONAL);
            assert!(s.acs.get(0, c) <= along + 1e-9, "row 0, col {c}");
        }
        // South along column 0, then diagonal staircase.
        let mut path = 0.0;
        for r in 1..9 {
            path += field.step_cost((r, 0), (r - 1, 0), ORTHOGONAL);
            assert!(s.acs.get(r, 0) <= path + 1e-9, "col 0, row {r}");
        }
        let mut diag = 0.0;
        for k in 1..9 {
            diag += field.step_cost((k, k), (k - 1, k - 1), DIAGONAL);
            assert!(s.acs.get(k, k) <= diag + 1e-9, "diagonal {k}");
        }
    }

    #[test]
    fn backlinks_point_downhill_in_accumulated_cost() {
        let field = CostField::new(hills(10, 10), &CostConfig::default()).unwrap();
        let s = run(&field, &[(4, 6)]);
        for r in 0..10 {
            for c in 0..10 {
                let (dr, dc) = s.backlink((r, c));
                if (dr, dc) == (0, 0) {
                    continue;
                }
                let pred = s.acs.offset((r, c), dr as isize, dc as isize).unwrap();
                assert!(s.acs.at(pred) < s.acs.get(r, c));
            }
        }
    }

    #[test]
    fn bottom_right_source_needs_backward_sweep() {
        let field = flat_field(5, 5);
        let s = run(&field, &[(4, 4)]);
        assert_relative_eq!(s.acs.get(0, 0), 4.0 * DIAGONAL, epsilon = 1e-9);
        assert_eq!(s.backlink((0, 0)), (1, 1));

        let err = transform(seed(5, 5, &[(4, 4)]), &field, 1).unwrap_err();
        assert!(matches!(err, NumericalError::NotConverged { pairs: 1, .. }));
    }

    #[test]
    fn convergence_measures_change_across_whole_pair() {
        // The middle cell drops 0.3 in the forward sweep (from the left) and
        // another 0.3 in the backward sweep (from the right): 0.6 over the
        // pair, so a second pair is required.
        let cost = UniformCost {
            rows: 1,
            cols: 3,
            cellsize: 1.0,
        };
        let start = Grid {
            rows: 1,
            cols: 3,
            data: vec![0.3, ORTHOGONAL + 0.6, 0.0],
        };

        let s = transform(start.clone(), &cost, 10).unwrap();
        assert_eq!(s.sweep_pairs, 2);
        assert_relative_eq!(s.acs.get(0, 1), ORTHOGONAL, epsilon = 1e-12);
        assert_eq!(s.backlink((0, 1)), (0, 1));

        let err = transform(start, &cost, 1).unwrap_err();
        assert!(matches!(err, NumericalError::NotConverged { pairs: 1, .. }));
    }

    #[test]
    fn mismatched_seed_is_an_error() {
        let field = flat_field(4, 4);
        assert_eq!(
            transform(seed(3, 4, &[(0, 0)]), &field, 10),
            Err(NumericalError::SeedShape {
                seed: (3, 4),
                field: (4, 4)
            })
        );
    }

    #[test]
    fn nan_elevation_is_a_numerical_error() {
        let mut dem = Grid::new(4, 4, 0.0);
        dem.set(2, 1, f64::NAN);
        let field = CostField::new(dem, &CostConfig::default()).unwrap();
        let err = transform(seed(4, 4, &[(0, 0)]), &field, 10).unwrap_err();
        assert_eq!(err, NumericalError::NonFiniteElevation { cell: (2, 1) });
    }

    #[test]
    fn nodata_wall_forces_detour_through_gap() {
        let mut dem = Grid::new(7, 7, 0.0);
        for r in 0..6 {
            dem.set(r, 3, -9999.0);
        }
        let config = CostConfig {
            nodata: Some(-9999.0),
            ..CostConfig::default()
        };
        let field = CostField::new(dem, &config).unwrap();
        let s = run(&field, &[(0, 0)]);
        assert_eq!(s.acs.get(0, 3), UNREACHED);
        // Only row 6 crosses the wall, so (0, 6) costs more than the straight run.
        assert!(s.acs.get(0, 6) > 6.0 * ORTHOGONAL + 1.0);
        assert!(s.acs.get(0, 6) < UNREACHED);
    }

    #[test]
    fn mask_distance_is_zero_on_mask_and_geometric_elsewhere() {
        let mut mask = Grid::new(5, 8, false);
        mask.set(2, 0, true);
        let d = distance_to_mask(&mask, 10.0, default_sweep_cap(5, 8)).unwrap();
        assert_eq!(d.get(2, 0), 0.0);
        assert_relative_eq!(d.get(2, 7), 7.0 * ORTHOGONAL * 10.0, epsilon = 1e-9);
        assert!(d.get(0, 7) > d.get(2, 7));

        let empty = Grid::new(3, 3, false);
        let d = distance_to_mask(&empty, 1.0, 4).unwrap();
        assert!(d.data.iter().all(|&v| v == UNREACHED));
    }
}

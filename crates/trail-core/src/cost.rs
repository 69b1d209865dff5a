//! Traversal cost: terrain slope blended with the net-cost overlay.
//!
//! `CostField` owns the DEM and the net-cost grid. The simulator is the only
//! writer of net cost (once per edge, through `replace_netcost`); distance
//! transforms read it through the `StepCost` trait.
use serde::{Deserialize, Serialize};

use crate::config::CostConfig;
use crate::error::{ConfigError, NumericalError};
use crate::grid::{Cell, Grid};

/// Degree-4 polynomial mapping signed slope (rise/run) to a cost multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeCost {
    /// Highest power first.
    pub coef: [f64; 5],
}

impl SlopeCost {
    pub fn new(coef: [f64; 5]) -> Self {
        Self { coef }
    }

    /// Constant cost 1 regardless of slope.
    pub fn flat() -> Self {
        Self::new([0.0, 0.0, 0.0, 0.0, 1.0])
    }

    #[inline]
    pub fn eval(&self, slope: f64) -> f64 {
        self.coef.iter().fold(0.0, |acc, &c| acc * slope + c)
    }

    /// Least-squares fit from `(slope_degrees, cost)` samples.
    ///
    /// Slopes are converted to rise/run (`tan`) before fitting so the result
    /// evaluates directly against DEM gradients.
    pub fn fit_degrees(samples: &[(f64, f64)]) -> Result<Self, ConfigError> {
        if samples.len() < 5 {
            return Err(ConfigError::TooFewSamples(samples.len()));
        }

        // Normal equations: (VᵀV) a = Vᵀy, V[k][j] = x_k^j (ascending powers).
        let mut ata = [[0.0f64; 5]; 5];
        let mut aty = [0.0f64; 5];
        for &(deg, cost) in samples {
            let x = deg.to_radians().tan();
            let mut pow = [1.0f64; 5];
            for j in 1..5 {
                pow[j] = pow[j - 1] * x;
            }
            for i in 0..5 {
                aty[i] += pow[i] * cost;
                for j in 0..5 {
                    ata[i][j] += pow[i] * pow[j];
                }
            }
        }

        let ascending = solve5(ata, aty).ok_or(ConfigError::SingularFit)?;
        let mut coef = [0.0; 5];
        for (i, c) in ascending.iter().enumerate() {
            coef[4 - i] = *c;
        }
        if coef.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::SingularFit);
        }
        Ok(Self { coef })
    }
}

impl Default for SlopeCost {
    fn default() -> Self {
        Self::flat()
    }
}

/// Gaussian elimination with partial pivoting on a 5×5 system.
fn solve5(mut a: [[f64; 5]; 5], mut b: [f64; 5]) -> Option<[f64; 5]> {
    for col in 0..5 {
        let pivot = (col..5).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..5 {
            let f = a[row][col] / a[col][col];
            for k in col..5 {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = [0.0f64; 5];
    for row in (0..5).rev() {
        let tail: f64 = (row + 1..5).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Per-step cost seen by a distance transform.
pub trait StepCost {
    /// `(rows, cols)` of the field; the seed grid must match.
    fn shape(&self) -> (usize, usize);

    /// Inactive cells are never relaxed and never act as predecessors.
    fn is_active(&self, _cell: Cell) -> bool {
        true
    }

    /// Cost of stepping from predecessor `from` into `to` over a window offset
    /// of local distance `base`.
    fn step_cost(&self, to: Cell, from: Cell, base: f64) -> f64;

    /// Reject inputs that would poison the accumulated surface.
    fn check_finite(&self) -> Result<(), NumericalError> {
        Ok(())
    }
}

/// Terrain + net cost state carried across the whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostField {
    dem: Grid<f64>,
    netcost: Grid<f64>,
    cellsize: f64,
    weight: f64,
    slope_cost: SlopeCost,
    nodata: Option<f64>,
}

impl CostField {
    /// Build a cost field with no reinforced cells yet (net cost 1 everywhere).
    pub fn new(dem: Grid<f64>, config: &CostConfig) -> Result<Self, ConfigError> {
        let netcost = Grid::new(dem.rows, dem.cols, 1.0);
        Self::with_netcost(dem, netcost, config)
    }

    /// Build a cost field with an explicit initial net cost.
    pub fn with_netcost(
        dem: Grid<f64>,
        netcost: Grid<f64>,
        config: &CostConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_len("dem", &dem)?;
        if dem.is_empty() {
            return Err(ConfigError::EmptyGrid);
        }
        check_netcost(&dem, &netcost)?;
        Ok(Self {
            dem,
            netcost,
            cellsize: config.cellsize,
            weight: config.weight,
            slope_cost: SlopeCost::new(config.coef),
            nodata: config.nodata,
        })
    }

    pub fn dem(&self) -> &Grid<f64> {
        &self.dem
    }

    pub fn netcost(&self) -> &Grid<f64> {
        &self.netcost
    }

    pub fn cellsize(&self) -> f64 {
        self.cellsize
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn slope_cost(&self) -> &SlopeCost {
        &self.slope_cost
    }

    /// Swap in a new net-cost overlay. The simulator calls this once per edge.
    pub fn replace_netcost(&mut self, netcost: Grid<f64>) -> Result<(), ConfigError> {
        check_netcost(&self.dem, &netcost)?;
        self.netcost = netcost;
        Ok(())
    }

    /// Terrain multiplier for moving `from → to`, floored at zero.
    pub fn terrain_cost(&self, to: Cell, from: Cell, base: f64) -> f64 {
        let rise = self.dem.at(to) - self.dem.at(from);
        let run = base * self.cellsize;
        self.slope_cost.eval(rise / run).max(0.0)
    }

    /// Blend of terrain cost and net cost at `to`.
    pub fn local_cost(&self, to: Cell, from: Cell, base: f64) -> f64 {
        let terrain = self.terrain_cost(to, from, base);
        (1.0 - self.weight) * terrain + self.weight * self.netcost.at(to)
    }
}

/// Deserialized grids carry their own `rows`/`cols`, so the buffer length is
/// not guaranteed.
fn check_len(name: &'static str, g: &Grid<f64>) -> Result<(), ConfigError> {
    if g.data.len() != g.rows * g.cols {
        return Err(ConfigError::DataLength {
            name,
            expected: g.rows * g.cols,
            actual: g.data.len(),
        });
    }
    Ok(())
}

fn check_netcost(dem: &Grid<f64>, netcost: &Grid<f64>) -> Result<(), ConfigError> {
    if !netcost.same_shape(dem) {
        return Err(ConfigError::Shape {
            name: "netcost",
            expected: dem.shape(),
            actual: netcost.shape(),
        });
    }
    check_len("netcost", netcost)?;
    if let Some(i) = netcost.data.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(ConfigError::NetCost {
            cell: (i / netcost.cols, i % netcost.cols),
        });
    }
    Ok(())
}

impl StepCost for CostField {
    fn shape(&self) -> (usize, usize) {
        self.dem.shape()
    }

    fn is_active(&self, cell: Cell) -> bool {
        match self.nodata {
            Some(nd) if nd.is_nan() => !self.dem.at(cell).is_nan(),
            Some(nd) => self.dem.at(cell) != nd,
            None => true,
        }
    }

    fn step_cost(&self, to: Cell, from: Cell, base: f64) -> f64 {
        base * self.local_cost(to, from, base)
    }

    fn check_finite(&self) -> Result<(), NumericalError> {
        let cols = self.dem.cols;
        for (i, v) in self.dem.data.iter().enumerate() {
            let cell = (i / cols, i % cols);
            if !v.is_finite() && self.is_active(cell) {
                return Err(NumericalError::NonFiniteElevation { cell });
            }
        }
        Ok(())
    }
}

/// Pure geometric distance: every step costs `base × cellsize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformCost {
    pub rows: usize,
    pub cols: usize,
    pub cellsize: f64,
}

impl StepCost for UniformCost {
    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn step_cost(&self, _to: Cell, _from: Cell, base: f64) -> f64 {
        base * self.cellsize
    }
}

//! 5×5 chamfer window: local distance weights and the two half-plane offset
//! sets used by the forward and backward sweeps.
//!
//! Window layout around the current cell `*` (row offset, col offset):
//! ```text
//!          (-2,-1)   (-2,+1)
//! (-1,-2)  (-1,-1)  (-1, 0)  (-1,+1)  (-1,+2)
//!          ( 0,-1)     *     ( 0,+1)
//! (+1,-2)  (+1,-1)  (+1, 0)  (+1,+1)  (+1,+2)
//!          (+2,-1)   (+2,+1)
//! ```

/// Knight-like long step (one diagonal plus one orthogonal).
pub const KNIGHT: f64 = 2.2062;
/// Diagonal step.
pub const DIAGONAL: f64 = 1.4141;
/// Orthogonal step.
pub const ORTHOGONAL: f64 = 0.9866;

/// Sweep stops once a forward+backward pair changes no cell by this much.
pub const CONVERGENCE_THRESHOLD: f64 = 0.5;

/// Accumulated cost of a cell no source has reached.
pub const UNREACHED: f64 = 999_999.0;

/// One window offset: predecessor lies at `(row + dr, col + dc)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub dr: i8,
    pub dc: i8,
    /// Local distance in cell units.
    pub base: f64,
}

const fn step(dr: i8, dc: i8, base: f64) -> Step {
    Step { dr, dc, base }
}

/// Offsets into cells already visited by a row-major sweep.
pub const FORWARD: [Step; 8] = [
    step(-2, -1, KNIGHT),
    step(-2, 1, KNIGHT),
    step(-1, -2, KNIGHT),
    step(-1, -1, DIAGONAL),
    step(-1, 0, ORTHOGONAL),
    step(-1, 1, DIAGONAL),
    step(-1, 2, KNIGHT),
    step(0, -1, ORTHOGONAL),
];

/// Mirror of `FORWARD` for the reverse row-major sweep.
pub const BACKWARD: [Step; 8] = [
    step(0, 1, ORTHOGONAL),
    step(1, -2, KNIGHT),
    step(1, -1, DIAGONAL),
    step(1, 0, ORTHOGONAL),
    step(1, 1, DIAGONAL),
    step(1, 2, KNIGHT),
    step(2, -1, KNIGHT),
    step(2, 1, KNIGHT),
];

//! Integer line rasterization (Bresenham) used to fill backlink jumps.
use crate::grid::Cell;

/// Append the cells of the straight segment `from → to` to `out`.
///
/// `from` is included, `to` is not, so consecutive segments of a chain share
/// no cell. Every appended cell is 8-adjacent to the next one.
pub fn segment_into(from: Cell, to: Cell, out: &mut Vec<Cell>) {
    let (r0, c0) = (from.0 as i64, from.1 as i64);
    let (r1, c1) = (to.0 as i64, to.1 as i64);

    let delta_r = (r1 - r0).abs();
    let delta_c = (c1 - c0).abs();
    let sign_r = if r0 < r1 { 1 } else { -1 };
    let sign_c = if c0 < c1 { 1 } else { -1 };
    let mut err = delta_c - delta_r;

    let (mut r, mut c) = (r0, c0);
    while r != r1 || c != c1 {
        out.push((r as usize, c as usize));
        let e2 = 2 * err;
        if e2 > -delta_r {
            err -= delta_r;
            c += sign_c;
        }
        if e2 < delta_c {
            err += delta_c;
            r += sign_r;
        }
    }
}

/// Chebyshev (king-move) distance between two cells.
pub fn chebyshev(a: Cell, b: Cell) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

//! Path reconstruction from backlink grids.
//!
//! Starting at the destination, follow `(blx, bly)` offsets until a cell with a
//! zero offset. Offsets larger than one cell are filled in with
//! `line::segment_into`, so the recorded track is always 8-connected.
use crate::error::TraceError;
use crate::grid::{Cell, Grid};
use crate::line::segment_into;
use crate::network::PathRecord;

/// Reconstruct the route from `origin` to `destination`.
///
/// The chain must end at `origin`; ending anywhere else means the destination
/// was never reached. At most `rows × cols` backlinks are followed.
pub fn trace(
    blx: &Grid<i8>,
    bly: &Grid<i8>,
    origin: Cell,
    destination: Cell,
    path_id: usize,
) -> Result<PathRecord, TraceError> {
    if !blx.contains(destination) {
        return Err(TraceError::OutsideGrid {
            cell: (destination.0 as i64, destination.1 as i64),
        });
    }
    let limit = blx.len();
    let mut track = Vec::new();
    let mut current = destination;
    let mut steps = 0usize;

    loop {
        let (dr, dc) = (blx.at(current), bly.at(current));
        if dr == 0 && dc == 0 {
            break;
        }
        steps += 1;
        if steps > limit {
            return Err(TraceError::Cycle { destination, limit });
        }
        let Some(next) = blx.offset(current, dr as isize, dc as isize) else {
            return Err(TraceError::OutsideGrid {
                cell: (current.0 as i64 + dr as i64, current.1 as i64 + dc as i64),
            });
        };
        segment_into(current, next, &mut track);
        current = next;
    }
    track.push(current);

    if current != origin {
        return Err(TraceError::Unreachable { origin, destination });
    }

    track.reverse();
    Ok(PathRecord {
        id: path_id,
        origin,
        destination,
        track,
        failure: None,
    })
}

/// Trace several destinations against one origin's backlinks.
///
/// Records are numbered from `first_id`. Destinations that fail come back as
/// failed records. The raster is the union of all successful tracks, so a
/// sub-path shared by several destinations is counted once.
pub fn trace_batch(
    blx: &Grid<i8>,
    bly: &Grid<i8>,
    origin: Cell,
    destinations: &[Cell],
    first_id: usize,
) -> (Vec<PathRecord>, Grid<u8>) {
    let mut raster = Grid::new(blx.rows, blx.cols, 0u8);
    let records = destinations
        .iter()
        .enumerate()
        .map(|(k, &dest)| match trace(blx, bly, origin, dest, first_id + k) {
            Ok(record) => {
                record.mark(&mut raster);
                record
            }
            Err(e) => PathRecord::failed(first_id + k, origin, dest, e.into()),
        })
        .collect();
    (records, raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_sweep_cap, CostConfig};
    use crate::cost::CostField;
    use crate::line::chebyshev;
    use crate::transform::{seed, transform};

    fn links(rows: usize, cols: usize, set: &[(Cell, (i8, i8))]) -> (Grid<i8>, Grid<i8>) {
        let mut blx = Grid::new(rows, cols, 0i8);
        let mut bly = Grid::new(rows, cols, 0i8);
        for &((r, c), (dr, dc)) in set {
            blx.set(r, c, dr);
            bly.set(r, c, dc);
        }
        (blx, bly)
    }

    fn assert_eight_connected(track: &[Cell]) {
        for pair in track.windows(2) {
            assert_eq!(chebyshev(pair[0], pair[1]), 1, "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn flat_five_by_five_diagonal() {
        let field = CostField::new(Grid::new(5, 5, 0.0), &CostConfig::default()).unwrap();
        let s = transform(seed(5, 5, &[(0, 0)]), &field, default_sweep_cap(5, 5)).unwrap();
        let rec = trace(&s.blx, &s.bly, (0, 0), (4, 4), 3).unwrap();
        assert_eq!(rec.track, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
        assert_eq!(rec.id, 3);
        assert!(rec.is_ok());
    }

    #[test]
    fn knight_jumps_are_filled_in() {
        // (4,2) → (2,1) → (0,0): two knight jumps.
        let (blx, bly) = links(5, 3, &[((4, 2), (-2, -1)), ((2, 1), (-2, -1))]);
        let rec = trace(&blx, &bly, (0, 0), (4, 2), 0).unwrap();
        assert_eq!(rec.track.first(), Some(&(0, 0)));
        assert_eq!(rec.track.last(), Some(&(4, 2)));
        assert_eq!(rec.track.len(), 5);
        assert_eight_connected(&rec.track);
        let unique: std::collections::HashSet<_> = rec.track.iter().collect();
        assert_eq!(unique.len(), rec.track.len(), "no duplicated cells");
    }

    #[test]
    fn origin_equal_to_destination() {
        let (blx, bly) = links(3, 3, &[]);
        let rec = trace(&blx, &bly, (1, 1), (1, 1), 0).unwrap();
        assert_eq!(rec.track, vec![(1, 1)]);
    }

    #[test]
    fn cyclic_backlinks_are_rejected() {
        let (blx, bly) = links(3, 3, &[((1, 1), (0, 1)), ((1, 2), (0, -1))]);
        let err = trace(&blx, &bly, (0, 0), (1, 1), 0).unwrap_err();
        assert_eq!(err, TraceError::Cycle { destination: (1, 1), limit: 9 });
    }

    #[test]
    fn chain_ending_away_from_origin_is_unreachable() {
        let (blx, bly) = links(3, 3, &[((2, 2), (-1, -1))]);
        let err = trace(&blx, &bly, (0, 0), (2, 2), 0).unwrap_err();
        assert_eq!(err, TraceError::Unreachable { origin: (0, 0), destination: (2, 2) });
    }

    #[test]
    fn backlink_leaving_grid_is_rejected() {
        let (blx, bly) = links(3, 3, &[((0, 1), (-1, 0))]);
        let err = trace(&blx, &bly, (0, 0), (0, 1), 0).unwrap_err();
        assert_eq!(err, TraceError::OutsideGrid { cell: (-1, 1) });
    }

    #[test]
    fn batch_raster_counts_shared_cells_once() {
        let field = CostField::new(Grid::new(3, 7, 0.0), &CostConfig::default()).unwrap();
        let s = transform(seed(3, 7, &[(1, 0)]), &field, default_sweep_cap(3, 7)).unwrap();
        let (records, raster) = trace_batch(&s.blx, &s.bly, (1, 0), &[(1, 6), (1, 4)], 10);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 10);
        assert_eq!(records[1].id, 11);
        assert!(records.iter().all(PathRecord::is_ok));
        assert!(raster.data.iter().all(|&v| v <= 1));
        for c in 0..7 {
            assert_eq!(raster.get(1, c), 1, "col {c}");
        }
    }

    #[test]
    fn batch_keeps_failed_destinations() {
        let (blx, bly) = links(3, 3, &[((0, 1), (0, -1))]);
        let (records, raster) = trace_batch(&blx, &bly, (0, 0), &[(0, 1), (2, 2)], 0);
        assert!(records[0].is_ok());
        assert!(!records[1].is_ok());
        assert!(records[1].track.is_empty());
        assert_eq!(raster.data.iter().map(|&v| v as u32).sum::<u32>(), 2);
    }
}

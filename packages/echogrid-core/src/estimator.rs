//! estimator.rs — nearest-match search and grid snapping
//!
//! Two stateless operations over the immutable amplitude map:
//!
//! 1. `find_closest_position` — linear least-squared-error scan over every
//!    map entry. Always returns the best match, however poor; there is no
//!    "no good match" error by design. Callers wanting a quality gate can
//!    threshold [`RawMatch::squared_error`] themselves.
//! 2. `snap_to_grid` — corrects any continuous coordinate to the nearest
//!    cell center. The search already returns a cell center, so snapping
//!    its output is idempotent; the step guards future callers that feed
//!    interpolated coordinates.

use std::collections::BTreeMap;

use crate::geometry::{CellIndex, Point2};
use crate::map::{AmplitudeMap, AmplitudeVector};
use crate::mic::MicArray;

/// Best map entry for a received amplitude vector, before snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMatch {
    pub cell: CellIndex,
    /// Physical center of the winning cell
    pub center: Point2,
    /// Minimum sum-of-squared-differences — caller-side quality signal
    pub squared_error: f64,
}

/// One completed estimation cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionEstimate {
    pub cell: CellIndex,
    /// Raw matched coordinate (cell center from the table scan)
    pub raw: Point2,
    /// Grid-snapped corrected coordinate
    pub snapped: Point2,
    pub squared_error: f64,
}

/// Stateless search over an immutable [`AmplitudeMap`].
#[derive(Debug, Clone)]
pub struct PositionEstimator {
    map: AmplitudeMap,
    mics: MicArray,
}

impl PositionEstimator {
    pub fn new(map: AmplitudeMap, mics: MicArray) -> Self {
        Self { map, mics }
    }

    pub fn map(&self) -> &AmplitudeMap {
        &self.map
    }

    pub fn mics(&self) -> &MicArray {
        &self.mics
    }

    /// Scan the whole map for the entry with the least squared error
    /// against `received`.
    ///
    /// Ties are broken by the first entry encountered in row-major order —
    /// only a strictly lower error displaces the current best, so results
    /// are reproducible. Returns `None` only for an empty map.
    pub fn find_closest_position(&self, received: &AmplitudeVector) -> Option<RawMatch> {
        let mut best: Option<(CellIndex, f64)> = None;
        for (cell, expected) in self.map.iter() {
            let err = expected.squared_error(received);
            match best {
                Some((_, min)) if err >= min => {}
                _ => best = Some((cell, err)),
            }
        }
        best.map(|(cell, squared_error)| RawMatch {
            cell,
            center: self.map.grid().cell_center(cell),
            squared_error,
        })
    }

    /// Correct a continuous coordinate to the nearest cell center.
    pub fn snap_to_grid(&self, p: Point2) -> Point2 {
        self.map.grid().snap_to_center(p)
    }

    /// Full cycle: assemble the received vector from per-mic readings
    /// (missing mics contribute 0.0), search, then snap.
    pub fn estimate(&self, readings: &BTreeMap<u32, f64>) -> Option<PositionEstimate> {
        let received = self.mics.vector_from(readings);
        let raw = self.find_closest_position(&received)?;
        Some(PositionEstimate {
            cell: raw.cell,
            raw: raw.center,
            snapped: self.snap_to_grid(raw.center),
            squared_error: raw.squared_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridSpec;
    use crate::map::AmplitudeMap;
    use crate::mic::Microphone;
    use crate::propagation::PropagationModel;

    /// Asymmetric mic layout so no two cells are equidistant from all mics
    fn estimator() -> PositionEstimator {
        let grid = GridSpec::new(16, 0.5).unwrap();
        let mics = MicArray::new(vec![
            Microphone { id: 1, pos: Point2::new(0.25, 0.25) },
            Microphone { id: 2, pos: Point2::new(0.25, 7.75) },
            Microphone { id: 3, pos: Point2::new(7.75, 7.75) },
        ])
        .unwrap();
        let model = PropagationModel::new(1000.0, 0.1);
        let map = AmplitudeMap::build(grid, &mics, &model);
        PositionEstimator::new(map, mics)
    }

    #[test]
    fn exact_match_returns_its_own_cell() {
        let est = estimator();
        for cell in [CellIndex::new(0, 0), CellIndex::new(7, 3), CellIndex::new(15, 15)] {
            let stored = est.map().get(cell).unwrap().clone();
            let m = est.find_closest_position(&stored).unwrap();
            assert_eq!(m.cell, cell);
            assert_eq!(m.squared_error, 0.0);
            assert_eq!(m.center, est.map().grid().cell_center(cell));
        }
    }

    #[test]
    fn corner_cell_scenario() {
        // Source at cell (0,0), center (0.25, 0.25): mic 1 sits on the
        // center, so its stored amplitude is the 100000 clamp. Feeding the
        // stored vector back must return (0.25, 0.25).
        let est = estimator();
        let stored = est.map().get(CellIndex::new(0, 0)).unwrap().clone();
        assert_eq!(stored.as_slice()[0], 100_000.0);
        let m = est.find_closest_position(&stored).unwrap();
        assert_eq!(m.center, Point2::new(0.25, 0.25));
    }

    #[test]
    fn deterministic_across_calls() {
        let est = estimator();
        let received = AmplitudeVector::new(vec![42.0, 17.0, 250.0]);
        let a = est.find_closest_position(&received).unwrap();
        let b = est.find_closest_position(&received).unwrap();
        assert_eq!(a, b);
        assert_eq!(est.snap_to_grid(a.center), est.snap_to_grid(b.center));
    }

    #[test]
    fn implausible_input_still_matches_best_effort() {
        let est = estimator();
        let received = AmplitudeVector::new(vec![-5.0, 1e9, 0.0]);
        assert!(est.find_closest_position(&received).is_some());
    }

    #[test]
    fn missing_mic_reading_is_zero_filled() {
        let est = estimator();
        let mut readings = BTreeMap::new();
        readings.insert(1, 100.0);
        readings.insert(3, 40.0);
        // mic 2 missing — estimate must still produce a fix
        let fix = est.estimate(&readings).unwrap();
        assert_eq!(fix.snapped, est.map().grid().cell_center(fix.cell));
    }

    #[test]
    fn estimate_output_is_grid_aligned() {
        let est = estimator();
        let mut readings = BTreeMap::new();
        readings.insert(1, 300.0);
        readings.insert(2, 80.0);
        readings.insert(3, 55.0);
        let fix = est.estimate(&readings).unwrap();
        // Raw output is already a cell center, so snapping is a no-op
        assert_eq!(fix.raw, fix.snapped);
        assert_eq!(est.snap_to_grid(fix.snapped), fix.snapped);
    }

    #[test]
    fn ties_resolve_to_first_row_major_entry() {
        // Symmetric layout on a 2x2 grid: a single mic in the exact room
        // center is equidistant from all four cell centers, so every entry
        // ties — the winner must be (0, 0), the first enumerated.
        let grid = GridSpec::new(2, 1.0).unwrap();
        let mics = MicArray::new(vec![Microphone { id: 1, pos: Point2::new(1.0, 1.0) }]).unwrap();
        let model = PropagationModel::new(1000.0, 0.1);
        let map = AmplitudeMap::build(grid, &mics, &model);
        let est = PositionEstimator::new(map, mics);
        let m = est.find_closest_position(&AmplitudeVector::new(vec![0.0])).unwrap();
        assert_eq!(m.cell, CellIndex::new(0, 0));
    }
}

//! map.rs — precomputed amplitude lookup table
//!
//! For every grid cell the map stores the vector of expected amplitudes at
//! each microphone, computed once from the propagation model at startup.
//! `O(size² × N)` build cost — size² is small (typically ≤ a few hundred
//! cells), so this is acceptable startup latency, traded for a pure table
//! scan per estimation.
//!
//! Entries live in a dense row-major `Vec` indexed by cell, so lookups go
//! through integer indices and the enumeration order is fixed.

use crate::geometry::{CellIndex, GridSpec};
use crate::mic::MicArray;
use crate::propagation::PropagationModel;

/// Ordered amplitudes, one per microphone, in mic-id-ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeVector(Vec<f64>);

impl AmplitudeVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of squared per-microphone differences. A vector shorter than the
    /// other is padded with amplitude 0.0 (the missing-reading sentinel).
    pub fn squared_error(&self, other: &AmplitudeVector) -> f64 {
        let n = self.0.len().max(other.0.len());
        (0..n)
            .map(|k| {
                let a = self.0.get(k).copied().unwrap_or(0.0);
                let b = other.0.get(k).copied().unwrap_or(0.0);
                (a - b) * (a - b)
            })
            .sum()
    }
}

/// Immutable cell-center → expected-amplitudes table.
///
/// Built once from validated static configuration; no failure modes beyond
/// what [`GridSpec`] and [`MicArray`] already rejected. Share behind an
/// `Arc` — single writer at startup, then any number of readers.
#[derive(Debug, Clone)]
pub struct AmplitudeMap {
    grid: GridSpec,
    /// Row-major by (i, j), `i` outer — same order as `GridSpec::cells()`
    entries: Vec<AmplitudeVector>,
}

impl AmplitudeMap {
    /// Precompute the expected amplitude vector for every grid cell.
    pub fn build(grid: GridSpec, mics: &MicArray, model: &PropagationModel) -> Self {
        let entries = grid
            .cells()
            .map(|cell| {
                let center = grid.cell_center(cell);
                AmplitudeVector::new(
                    mics.iter()
                        .map(|m| model.amplitude(center, m.pos))
                        .collect(),
                )
            })
            .collect();
        Self { grid, entries }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, cell: CellIndex) -> Option<&AmplitudeVector> {
        if cell.i >= self.grid.size() || cell.j >= self.grid.size() {
            return None;
        }
        self.entries
            .get(cell.i as usize * self.grid.size() as usize + cell.j as usize)
    }

    /// Iterate entries in the fixed row-major tie-break order.
    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &AmplitudeVector)> {
        self.grid.cells().zip(self.entries.iter())
    }
}

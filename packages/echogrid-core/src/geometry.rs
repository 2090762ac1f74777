//! geometry.rs — room grid geometry
//!
//! The grid defines a bijection between integer cell indices `(i, j)` and
//! the physical center coordinate of that cell. The amplitude map is keyed
//! by [`CellIndex`], never by floating-point coordinates, so lookups are
//! never exposed to float-equality fragility. [`GridSpec::snap`] recovers
//! the nearest cell from any continuous coordinate ("grid magnetism").

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// 2D point in room coordinates, meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn dist(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Integer grid cell index, `0 <= i, j < size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub i: u32,
    pub j: u32,
}

impl CellIndex {
    pub fn new(i: u32, j: u32) -> Self {
        Self { i, j }
    }
}

/// Validated grid geometry: `size × size` cells of `cell_m` meters each.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridSpec {
    size: u32,
    cell_m: f64,
}

impl GridSpec {
    /// Build a grid spec, rejecting degenerate geometry at startup.
    pub fn new(size: u32, cell_m: f64) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::GridSize(size));
        }
        if !(cell_m > 0.0) || !cell_m.is_finite() {
            return Err(ConfigError::CellSize(cell_m));
        }
        Ok(Self { size, cell_m })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn cell_m(&self) -> f64 {
        self.cell_m
    }

    /// Total number of cells (`size²`)
    pub fn cell_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Room side length in meters
    pub fn side_m(&self) -> f64 {
        self.size as f64 * self.cell_m
    }

    /// Physical center coordinate of a cell
    pub fn cell_center(&self, cell: CellIndex) -> Point2 {
        Point2::new(
            cell.i as f64 * self.cell_m + self.cell_m / 2.0,
            cell.j as f64 * self.cell_m + self.cell_m / 2.0,
        )
    }

    /// Row-major enumeration over all cells (`i` outer, `j` inner).
    /// This order is the closest-match tie-break order and must not change.
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        let size = self.size;
        (0..size).flat_map(move |i| (0..size).map(move |j| CellIndex::new(i, j)))
    }

    /// Recover the cell index nearest to a continuous coordinate.
    ///
    /// `i = round(x / cell_m - 0.5)` with round-half-away-from-zero
    /// (`f64::round`). Indices outside `[0, size)` are clamped to the room:
    /// a source cannot be outside the fixed room geometry, so an escaped
    /// coordinate is numeric drift, not a new location.
    pub fn snap(&self, p: Point2) -> CellIndex {
        let max = (self.size - 1) as i64;
        let i = (p.x / self.cell_m - 0.5).round() as i64;
        let j = (p.y / self.cell_m - 0.5).round() as i64;
        CellIndex::new(i.clamp(0, max) as u32, j.clamp(0, max) as u32)
    }

    /// Snap a continuous coordinate to the nearest cell center.
    /// Idempotent: `snap_to_center(snap_to_center(p)) == snap_to_center(p)`.
    pub fn snap_to_center(&self, p: Point2) -> Point2 {
        self.cell_center(self.snap(p))
    }
}

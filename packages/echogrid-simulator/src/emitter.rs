//! emitter.rs — moving acoustic source simulation
//!
//! Simulates a person walking around the room on the grid. Movement is
//! deliberately human-like rather than uniform: the walker keeps its
//! previous direction 75% of the time, and otherwise draws a new one with
//! straight moves weighted 4:1 over diagonals. Every step lands on a valid
//! cell, so the ground truth is always a cell center.

use rand::Rng;

use echogrid_core::{CellIndex, GridSpec, Point2};

const STRAIGHT_MOVES: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL_MOVES: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
/// Probability of continuing in the previous direction
const CONTINUE_P: f64 = 0.75;

/// Random-walk source position on the grid.
#[derive(Debug, Clone)]
pub struct SourceWalk {
    grid: GridSpec,
    cell: CellIndex,
    last_move: (i32, i32),
}

impl SourceWalk {
    pub fn new(grid: GridSpec, rng: &mut impl Rng) -> Self {
        let cell = CellIndex::new(
            rng.gen_range(0..grid.size()),
            rng.gen_range(0..grid.size()),
        );
        Self { grid, cell, last_move: (0, 0) }
    }

    pub fn cell(&self) -> CellIndex {
        self.cell
    }

    /// Ground-truth position in meters (always a cell center)
    pub fn position(&self) -> Point2 {
        self.grid.cell_center(self.cell)
    }

    fn in_bounds(&self, i: i32, j: i32) -> bool {
        i >= 0 && j >= 0 && (i as u32) < self.grid.size() && (j as u32) < self.grid.size()
    }

    /// Advance one step and return the new cell.
    pub fn step(&mut self, rng: &mut impl Rng) -> CellIndex {
        let (di, dj) = self.last_move;
        let (ci, cj) = (self.cell.i as i32, self.cell.j as i32);

        let chosen = if self.last_move != (0, 0)
            && self.in_bounds(ci + di, cj + dj)
            && rng.gen_bool(CONTINUE_P)
        {
            self.last_move
        } else {
            // Straight moves weighted 4:1 over diagonals; redraw until the
            // candidate stays in the room
            loop {
                let pick: usize = rng.gen_range(0..20);
                let mv = if pick < 16 {
                    STRAIGHT_MOVES[pick % 4]
                } else {
                    DIAGONAL_MOVES[pick - 16]
                };
                if self.in_bounds(ci + mv.0, cj + mv.1) {
                    break mv;
                }
            }
        };

        self.cell = CellIndex::new((ci + chosen.0) as u32, (cj + chosen.1) as u32);
        self.last_move = chosen;
        self.cell
    }
}

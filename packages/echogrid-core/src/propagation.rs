//! propagation.rs — inverse-square acoustic propagation model
//!
//! Pure physics: amplitude at a microphone given a source position.
//! `A = K / d²` with a minimum-distance clamp so a source directly atop a
//! microphone caps at `K / min_distance²` instead of blowing up the
//! division. K is a calibration constant of the deployment, not a derived
//! physical unit.

use crate::geometry::Point2;

/// Inverse-square propagation with a minimum-distance clamp.
/// Stateless and deterministic — safe to share freely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationModel {
    k: f64,
    min_distance_m: f64,
}

impl PropagationModel {
    /// Default clamp radius: 0.1 m
    pub const DEFAULT_MIN_DISTANCE_M: f64 = 0.1;

    pub fn new(k: f64, min_distance_m: f64) -> Self {
        Self { k, min_distance_m }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Expected amplitude at `mic` for a source at `source`.
    pub fn amplitude(&self, source: Point2, mic: Point2) -> f64 {
        let d = source.dist(&mic);
        if d > self.min_distance_m {
            self.k / (d * d)
        } else {
            self.max_amplitude()
        }
    }

    /// Largest representable amplitude (source within the clamp radius)
    pub fn max_amplitude(&self) -> f64 {
        self.k / (self.min_distance_m * self.min_distance_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> PropagationModel {
        PropagationModel::new(1000.0, 0.1)
    }

    #[test]
    fn clamps_inside_min_distance() {
        let m = model();
        let mic = Point2::new(0.25, 0.25);
        // Exactly atop the microphone
        assert_eq!(m.amplitude(mic, mic), 100_000.0);
        // 5 cm away, still inside the clamp radius
        assert_eq!(m.amplitude(Point2::new(0.30, 0.25), mic), 100_000.0);
        assert_eq!(m.max_amplitude(), 100_000.0);
    }

    #[test]
    fn inverse_square_beyond_clamp() {
        let m = model();
        let mic = Point2::new(0.0, 0.0);
        let a = m.amplitude(Point2::new(2.0, 0.0), mic);
        assert!((a - 250.0).abs() < 1e-9);
    }

    #[test]
    fn amplitude_strictly_decreases_with_distance() {
        let m = model();
        let mic = Point2::new(0.0, 0.0);
        let mut prev = f64::INFINITY;
        for step in 1..50 {
            let d = 0.11 + step as f64 * 0.2;
            let a = m.amplitude(Point2::new(d, 0.0), mic);
            assert!(a < prev, "amplitude must fall as distance grows (d={d})");
            prev = a;
        }
    }

    #[test]
    fn deterministic() {
        let m = model();
        let src = Point2::new(3.7, 1.2);
        let mic = Point2::new(0.25, 7.75);
        assert_eq!(m.amplitude(src, mic), m.amplitude(src, mic));
    }
}

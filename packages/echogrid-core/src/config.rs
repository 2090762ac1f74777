//! config.rs — room configuration surface
//!
//! Loaded once at startup, immutable afterwards: grid geometry, microphone
//! layout, propagation constant and the ADC link parameters. Validation is
//! the single fail-fast gate — a malformed room refuses to build an
//! amplitude map rather than silently degrade into nonsense coordinates.
//! There is no runtime reconfiguration; changing the room means a restart.

use serde::Deserialize;
use thiserror::Error;

use crate::adc::AdcCodec;
use crate::geometry::{GridSpec, Point2};
use crate::mic::{MicArray, Microphone};
use crate::propagation::PropagationModel;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid size must be >= 1 (got {0})")]
    GridSize(u32),
    #[error("cell size must be a positive finite length in meters (got {0})")]
    CellSize(f64),
    #[error("at least one microphone must be configured")]
    NoMicrophones,
    #[error("duplicate microphone id {0}")]
    DuplicateMicrophone(u32),
    #[error("microphone ids start at 1 (got {0})")]
    BadMicrophoneId(u32),
    #[error("propagation constant K must be positive and finite (got {0})")]
    KFactor(f64),
    #[error("minimum distance clamp must be positive and finite (got {0})")]
    MinDistance(f64),
    #[error("ADC resolution must be 1..=31 bits (got {0})")]
    AdcBits(u32),
    #[error("ADC full-scale amplitude must be positive and finite (got {0})")]
    AdcFullScale(f64),
}

/// One microphone entry as written in the config file
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MicConfig {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

/// Raw room configuration as deserialized from `[room]` in a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    /// Cells per side
    pub grid_size: u32,
    /// Physical cell size, meters
    pub cell_size_m: f64,
    /// Propagation calibration constant
    pub k_factor: f64,
    /// Inverse-square clamp radius, meters
    #[serde(default = "RoomConfig::default_min_distance_m")]
    pub min_distance_m: f64,
    pub microphones: Vec<MicConfig>,
    #[serde(default)]
    pub adc: AdcCodec,
}

impl Default for RoomConfig {
    /// The deployed room: 16×16 cells of 0.5 m, three microphones in an
    /// asymmetric corner layout, K = 1000.
    fn default() -> Self {
        Self {
            grid_size: 16,
            cell_size_m: 0.5,
            k_factor: 1000.0,
            min_distance_m: Self::default_min_distance_m(),
            microphones: vec![
                MicConfig { id: 1, x: 0.25, y: 0.25 },
                MicConfig { id: 2, x: 0.25, y: 7.75 },
                MicConfig { id: 3, x: 7.75, y: 7.75 },
            ],
            adc: AdcCodec::default(),
        }
    }
}

impl RoomConfig {
    fn default_min_distance_m() -> f64 {
        PropagationModel::DEFAULT_MIN_DISTANCE_M
    }

    /// Validate every field and assemble the immutable runtime model.
    pub fn validate(&self) -> Result<RoomModel, ConfigError> {
        let grid = GridSpec::new(self.grid_size, self.cell_size_m)?;
        let mics = MicArray::new(
            self.microphones
                .iter()
                .map(|m| Microphone { id: m.id, pos: Point2::new(m.x, m.y) })
                .collect(),
        )?;
        if !(self.k_factor > 0.0) || !self.k_factor.is_finite() {
            return Err(ConfigError::KFactor(self.k_factor));
        }
        if !(self.min_distance_m > 0.0) || !self.min_distance_m.is_finite() {
            return Err(ConfigError::MinDistance(self.min_distance_m));
        }
        Ok(RoomModel {
            grid,
            mics,
            propagation: PropagationModel::new(self.k_factor, self.min_distance_m),
            codec: self.adc,
        })
    }
}

/// Validated, ready-to-use room: everything the engine and the transports
/// need, constructed once and shared read-only.
#[derive(Debug, Clone)]
pub struct RoomModel {
    pub grid: GridSpec,
    pub mics: MicArray,
    pub propagation: PropagationModel,
    pub codec: AdcCodec,
}

//! # echogrid-core
//!
//! Position-estimation engine for the EchoGrid acoustic localization suite.
//!
//! These types are used by:
//! - `backend-rust`: decoding amplitude readings from MQTT and turning
//!   completed epoch batches into grid-aligned position fixes
//! - `packages/echogrid-simulator`: producing the same readings from a
//!   simulated moving source, through the same physics and ADC codec
//!
//! ## Coordinate Conventions
//!
//! - The room is a square grid of `size × size` cells, `cell_m` meters each
//! - Physical coordinates are meters from the room origin (corner)
//! - Cell `(i, j)` has its physical center at
//!   `(i * cell_m + cell_m / 2, j * cell_m + cell_m / 2)`
//!
//! ## Invariants
//! - The amplitude-vector ordering is microphone-id ascending, everywhere.
//!   A mismatched ordering silently corrupts estimation; [`MicArray`] is the
//!   single owner of that ordering.
//! - [`AmplitudeMap`] is built once from validated configuration and never
//!   mutated; it is shared read-only across tasks.
//! - Closest-match ties are broken by row-major enumeration order over
//!   `(i, j)`, `i` outer — pinned so results are reproducible.

pub mod adc;
pub mod batch;
pub mod config;
pub mod estimator;
pub mod geometry;
pub mod map;
pub mod mic;
pub mod propagation;
pub mod wire;

pub use adc::{AdcCodec, CodecError};
pub use batch::{BatcherConfig, EpochBatcher};
pub use config::{ConfigError, RoomConfig, RoomModel};
pub use estimator::{PositionEstimate, PositionEstimator, RawMatch};
pub use geometry::{CellIndex, GridSpec, Point2};
pub use map::{AmplitudeMap, AmplitudeVector};
pub use mic::{MicArray, Microphone};
pub use propagation::PropagationModel;
pub use wire::{AmplitudeReading, PositionFix};

//! mic.rs — microphone identities and the amplitude-vector ordering
//!
//! The microphone layout is static, known configuration: each microphone
//! has a small positive integer id and a fixed position in meters.
//! [`MicArray`] validates the set once at startup and stores it sorted by
//! id ascending — that order is the amplitude-vector ordering every other
//! component relies on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::geometry::Point2;
use crate::map::AmplitudeVector;

/// One fixed microphone in the room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Microphone {
    /// Identity, `1..=N`. Unique within the array.
    pub id: u32,
    /// Fixed position in room coordinates, meters
    pub pos: Point2,
}

/// Validated, id-sorted set of microphones. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicArray {
    mics: Vec<Microphone>,
}

impl MicArray {
    /// Validate and sort a microphone set. Rejects an empty set, ids of 0,
    /// and duplicate ids — all fatal configuration errors.
    pub fn new(mut mics: Vec<Microphone>) -> Result<Self, ConfigError> {
        if mics.is_empty() {
            return Err(ConfigError::NoMicrophones);
        }
        mics.sort_by_key(|m| m.id);
        for pair in mics.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(ConfigError::DuplicateMicrophone(pair[0].id));
            }
        }
        if mics[0].id == 0 {
            return Err(ConfigError::BadMicrophoneId(0));
        }
        Ok(Self { mics })
    }

    pub fn len(&self) -> usize {
        self.mics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mics.is_empty()
    }

    /// Microphones in amplitude-vector order (id ascending)
    pub fn iter(&self) -> impl Iterator<Item = &Microphone> {
        self.mics.iter()
    }

    /// Assemble a received amplitude vector from per-mic readings.
    ///
    /// A missing microphone contributes amplitude 0.0. That substitution is
    /// a deliberate carried-over policy, not an error path: callers are
    /// expected to batch a value for every microphone before estimating,
    /// and the batcher enforces that upstream.
    pub fn vector_from(&self, readings: &BTreeMap<u32, f64>) -> AmplitudeVector {
        AmplitudeVector::new(
            self.mics
                .iter()
                .map(|m| readings.get(&m.id).copied().unwrap_or(0.0))
                .collect(),
        )
    }
}

//! scenarios.rs — injectable fault scenarios for the simulator
//!
//! Each scenario exercises a specific backend behavior: amplitude noise
//! stresses the nearest-match search and the grid snapping, a silenced
//! microphone leaves half-filled batches behind and exercises the
//! stale-batch eviction. Scenarios are toggleable at runtime via the
//! WebSocket control API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Gaussian noise on every amplitude before quantization
    NoisyAmplitude,
    /// Periodically silence one microphone's readings (dead listener node)
    MicDropout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    /// Noise sigma in amplitude units (applies when NoisyAmplitude is active)
    pub noise_sigma: f64,
    /// Which microphone goes silent (applies when MicDropout is active)
    pub dropout_mic_id: u32,
    /// How many consecutive epochs the microphone stays silent
    pub dropout_duration_epochs: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            noise_sigma: 25.0,
            dropout_mic_id: 2,
            dropout_duration_epochs: 5,
        }
    }
}

impl ScenarioConfig {
    pub fn has(&self, s: &ScenarioType) -> bool {
        self.active.contains(s)
    }

    /// Effective amplitude noise for this epoch
    pub fn noise_sigma(&self) -> f64 {
        if self.has(&ScenarioType::NoisyAmplitude) {
            self.noise_sigma
        } else {
            0.0
        }
    }

    /// Whether this microphone's reading is silenced this epoch.
    /// Dropouts come in bursts: silent for `dropout_duration_epochs`, then
    /// alive for 10, repeating.
    pub fn is_mic_dropped(&self, mic_id: u32, epoch_counter: u32) -> bool {
        if !self.has(&ScenarioType::MicDropout) || mic_id != self.dropout_mic_id {
            return false;
        }
        epoch_counter % (self.dropout_duration_epochs + 10) < self.dropout_duration_epochs
    }
}

/// Predefined presets selectable from the CLI and the control socket
pub fn preset_noisy() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::NoisyAmplitude],
        ..Default::default()
    }
}

pub fn preset_mic_dropout() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::MicDropout],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_is_clean() {
        let sc = ScenarioConfig::default();
        assert_eq!(sc.noise_sigma(), 0.0);
        assert!(!sc.is_mic_dropped(2, 0));
    }

    #[test]
    fn dropout_bursts_then_recovers() {
        let sc = preset_mic_dropout();
        assert!(sc.is_mic_dropped(2, 0));
        assert!(sc.is_mic_dropped(2, 4));
        assert!(!sc.is_mic_dropped(2, 5));
        assert!(!sc.is_mic_dropped(2, 14));
        assert!(sc.is_mic_dropped(2, 15));
        // Other mics never drop
        assert!(!sc.is_mic_dropped(1, 0));
    }
}

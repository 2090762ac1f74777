//! wire.rs — MQTT message contract between listeners and the backend
//!
//! One JSON message per microphone per epoch on the amplitudes topic.
//! The amplitude travels as the fixed-width ADC bit payload, not as a
//! float — decoding goes through [`crate::AdcCodec`] on the backend side.

use serde::{Deserialize, Serialize};

/// One microphone's reported amplitude for one measurement epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeReading {
    /// Measurement epoch, unix seconds — the batch key
    pub epoch_s: u64,
    /// Reporting microphone, `1..=N`
    pub mic_id: u32,
    /// Fixed-width binary ADC payload (see [`crate::AdcCodec`])
    pub amplitude_bits: String,
}

/// One corrected position, as handed to persistence and the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub epoch_s: u64,
    /// Grid-snapped coordinate, meters
    pub x_m: f64,
    pub y_m: f64,
    /// Minimum squared error of the table scan (estimate quality signal)
    pub squared_error: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_round_trips_through_json() {
        let r = AmplitudeReading {
            epoch_s: 1_700_000_000,
            mic_id: 2,
            amplitude_bits: "0000000101".into(),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(serde_json::from_str::<AmplitudeReading>(&json).unwrap(), r);
    }

    #[test]
    fn reading_parses_wire_shape() {
        let r: AmplitudeReading = serde_json::from_str(
            r#"{"epoch_s": 1700000000, "mic_id": 1, "amplitude_bits": "1111111111"}"#,
        )
        .unwrap();
        assert_eq!(r.mic_id, 1);
        assert_eq!(r.amplitude_bits.len(), 10);
    }
}

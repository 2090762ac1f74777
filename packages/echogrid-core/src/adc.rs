//! adc.rs — simulated ADC quantization and FSK bit payload codec
//!
//! The listener nodes digitize each analog amplitude on a fixed number of
//! bits and ship the sample as a fixed-width binary string (the payload a
//! real FSK link would carry). Simulator and backend share this codec so
//! the two sides can never disagree on the amplitude scale.

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("amplitude payload has {got} bits, expected {expected}")]
    WrongLength { expected: u32, got: usize },
    #[error("amplitude payload is not a binary string: {0:?}")]
    NotBinary(String),
}

/// Fixed-point amplitude codec: `bits`-wide quantization over `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "AdcParams")]
pub struct AdcCodec {
    bits: u32,
    max_amplitude: f64,
}

/// Raw deserialization shape, validated into [`AdcCodec`].
#[derive(Debug, Deserialize)]
struct AdcParams {
    #[serde(default = "AdcCodec::default_bits")]
    bits: u32,
    #[serde(default = "AdcCodec::default_max_amplitude")]
    max_amplitude: f64,
}

impl TryFrom<AdcParams> for AdcCodec {
    type Error = ConfigError;

    fn try_from(p: AdcParams) -> Result<Self, ConfigError> {
        AdcCodec::new(p.bits, p.max_amplitude)
    }
}

impl Default for AdcCodec {
    fn default() -> Self {
        // 10 bits / 5000.0 full scale — the deployed link parameters
        Self { bits: Self::default_bits(), max_amplitude: Self::default_max_amplitude() }
    }
}

impl AdcCodec {
    fn default_bits() -> u32 {
        10
    }

    fn default_max_amplitude() -> f64 {
        5000.0
    }

    pub fn new(bits: u32, max_amplitude: f64) -> Result<Self, ConfigError> {
        if bits == 0 || bits > 31 {
            return Err(ConfigError::AdcBits(bits));
        }
        if !(max_amplitude > 0.0) || !max_amplitude.is_finite() {
            return Err(ConfigError::AdcFullScale(max_amplitude));
        }
        Ok(Self { bits, max_amplitude })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn max_amplitude(&self) -> f64 {
        self.max_amplitude
    }

    /// Number of quantization steps (`2^bits - 1`)
    fn levels(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Quantize an amplitude into a fixed-width binary payload.
    /// Out-of-range input is clamped to `[0, max_amplitude]` first.
    pub fn encode(&self, amplitude: f64) -> String {
        let clamped = amplitude.clamp(0.0, self.max_amplitude);
        let value = ((clamped / self.max_amplitude) * self.levels() as f64) as u32;
        format!("{value:0width$b}", width = self.bits as usize)
    }

    /// Recover the amplitude from a received binary payload.
    pub fn decode(&self, payload: &str) -> Result<f64, CodecError> {
        if payload.len() != self.bits as usize {
            return Err(CodecError::WrongLength { expected: self.bits, got: payload.len() });
        }
        let value = u32::from_str_radix(payload, 2)
            .map_err(|_| CodecError::NotBinary(payload.to_string()))?;
        Ok((value as f64 / self.levels() as f64) * self.max_amplitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AdcCodec {
        AdcCodec::default()
    }

    #[test]
    fn encodes_fixed_width() {
        let c = codec();
        assert_eq!(c.encode(0.0), "0000000000");
        assert_eq!(c.encode(5000.0), "1111111111");
        assert_eq!(c.encode(0.0).len(), 10);
    }

    #[test]
    fn clamps_out_of_range_amplitudes() {
        let c = codec();
        assert_eq!(c.encode(-3.0), c.encode(0.0));
        assert_eq!(c.encode(1e9), c.encode(5000.0));
    }

    #[test]
    fn round_trip_error_is_within_one_step() {
        let c = codec();
        let step = 5000.0 / 1023.0;
        for amp in [0.0, 12.5, 432.1, 2500.0, 4999.9, 5000.0] {
            let back = c.decode(&c.encode(amp)).unwrap();
            assert!((back - amp).abs() <= step, "amp={amp} back={back}");
        }
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        let c = codec();
        assert_eq!(
            c.decode("0101"),
            Err(CodecError::WrongLength { expected: 10, got: 4 })
        );
        assert!(matches!(c.decode("01010101x1"), Err(CodecError::NotBinary(_))));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(AdcCodec::new(0, 5000.0).is_err());
        assert!(AdcCodec::new(32, 5000.0).is_err());
        assert!(AdcCodec::new(10, 0.0).is_err());
    }
}

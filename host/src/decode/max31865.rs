//! MAX31865 RTD-to-digital converter decoder.
//!
//! # Encoding
//!
//! The RTD data registers hold a 15 bit ratio of the probe resistance to the
//! reference resistance, followed by a fault flag:
//!
//! ```txt
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        RTD ratio code       |F|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! where `R = R_ref × code / 2¹⁵`.
//!
//! See: [datasheet] § "RTD Data Registers".
//!
//! [datasheet]: https://www.analog.com/media/en/technical-documentation/data-sheets/MAX31865.pdf
use bitvec::prelude::*;
use uom::si::{electrical_resistance::ohm, thermodynamic_temperature::degree_celsius};

use crate::units::{ElectricalResistance, ThermodynamicTemperature};

pub type Result<T> = core::result::Result<T, Error>;

/// Reference resistor fitted next to the converter.
pub const REFERENCE_RESISTANCE_OHMS: f32 = 430.0;
/// Probe resistance at 0°C.
pub const PROBE_R0_OHMS: f32 = 100.0;
/// Probe sensitivity, from the calibration `R = 0.365·T + 100`.
pub const PROBE_OHMS_PER_DEGREE: f32 = 0.365;

/// Represents a MAX31865 decoding error.
#[derive(Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The converter flagged a fault, see [`decode_fault_status`].
    #[error("rtd fault flagged")]
    Fault,
    #[error("invalid temperature: expected -200°C≤x≤850°C, got {0}°C")]
    InvalidTemperature(f32),
}

/// Represents a MAX31865 register.
///
/// See: datasheet, table 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Config = 0x00,
    RtdMsb = 0x01,
    RtdLsb = 0x02,
    HighFaultThresholdMsb = 0x03,
    HighFaultThresholdLsb = 0x04,
    LowFaultThresholdMsb = 0x05,
    LowFaultThresholdLsb = 0x06,
    FaultStatus = 0x07,
}

impl Register {
    /// Address byte for reading the register.
    #[must_use]
    pub const fn read_address(self) -> u8 {
        self as u8 & 0x7f
    }

    /// Address byte for writing the register.
    #[must_use]
    pub const fn write_address(self) -> u8 {
        self as u8 | 0x80
    }
}

/// Probe wiring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wires {
    Two,
    Three,
    Four,
}

pub type ConfigPayload = BitArray<[u8; 1], Msb0>;
pub type RtdPayload = BitArray<[u8; 2], Msb0>;

/// Represents the configuration register.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Config(ConfigPayload);

impl Config {
    const BIAS: usize = 0;
    const AUTO_CONVERT: usize = 1;
    const ONE_SHOT: usize = 2;
    const THREE_WIRE: usize = 3;
    const FAULT_CYCLE: core::ops::Range<usize> = 4..6;
    const FAULT_CLEAR: usize = 6;
    const FILTER_50HZ: usize = 7;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(ConfigPayload::new([bits]))
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0.into_inner()[0]
    }

    #[must_use]
    pub fn with_bias(mut self, enabled: bool) -> Self {
        self.0.set(Self::BIAS, enabled);
        self
    }

    #[must_use]
    pub fn with_auto_convert(mut self, enabled: bool) -> Self {
        self.0.set(Self::AUTO_CONVERT, enabled);
        self
    }

    /// Requests a single conversion. The bit clears itself once it completes.
    #[must_use]
    pub fn with_one_shot(mut self) -> Self {
        self.0.set(Self::ONE_SHOT, true);
        self
    }

    #[must_use]
    pub fn with_wires(mut self, wires: Wires) -> Self {
        self.0.set(Self::THREE_WIRE, wires == Wires::Three);
        self
    }

    #[must_use]
    pub fn with_filter_50hz(mut self, enabled: bool) -> Self {
        self.0.set(Self::FILTER_50HZ, enabled);
        self
    }

    /// Requests the fault status to be cleared, without starting a conversion or a
    /// fault detection cycle.
    #[must_use]
    pub fn with_fault_clear(mut self) -> Self {
        self.0.set(Self::ONE_SHOT, false);
        self.0[Self::FAULT_CYCLE].fill(false);
        self.0.set(Self::FAULT_CLEAR, true);
        self
    }
}

/// Represents the fault status register.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultStatus {
    /// RTD above the high fault threshold.
    pub high_threshold: bool,
    /// RTD below the low fault threshold.
    pub low_threshold: bool,
    /// REFIN- above 0.85 × V_BIAS.
    pub refin_high: bool,
    /// REFIN- below 0.85 × V_BIAS, FORCE- open.
    pub refin_low: bool,
    /// RTDIN- below 0.85 × V_BIAS, FORCE- open.
    pub rtdin_low: bool,
    /// Over or under voltage on an input.
    pub over_under_voltage: bool,
}

impl FaultStatus {
    #[must_use]
    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

/// Decodes the fault status register.
#[must_use]
pub fn decode_fault_status(payload: u8) -> FaultStatus {
    let bits = payload.view_bits::<Msb0>();
    FaultStatus {
        high_threshold: bits[0],
        low_threshold: bits[1],
        refin_high: bits[2],
        refin_low: bits[3],
        rtdin_low: bits[4],
        over_under_voltage: bits[5],
    }
}

/// Extracts the 15 bit ratio code, ignoring the fault flag.
#[must_use]
pub fn ratio_code(payload: RtdPayload) -> u16 {
    payload[..15].load_be::<u16>()
}

/// Decodes the RTD data registers into the 15 bit ratio code.
pub fn decode_rtd(payload: RtdPayload) -> Result<u16> {
    if payload[15] {
        return Err(Error::Fault);
    }
    Ok(ratio_code(payload))
}

/// Converts a ratio code into the probe resistance.
#[must_use]
pub fn resistance(code: u16) -> ElectricalResistance {
    ElectricalResistance::new::<ohm>(REFERENCE_RESISTANCE_OHMS * f32::from(code) / 32768.0)
}

/// Converts a probe resistance into a temperature.
pub fn temperature(resistance: ElectricalResistance) -> Result<ThermodynamicTemperature> {
    let celsius = (resistance.get::<ohm>() - PROBE_R0_OHMS) / PROBE_OHMS_PER_DEGREE;

    if !(-200.0..=850.0).contains(&celsius) {
        return Err(Error::InvalidTemperature(celsius));
    }

    Ok(ThermodynamicTemperature::new::<degree_celsius>(celsius))
}

/// Decodes the RTD data registers into a temperature.
pub fn decode(payload: RtdPayload) -> Result<ThermodynamicTemperature> {
    temperature(resistance(decode_rtd(payload)?))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn register_addresses() {
        assert_eq!(Register::Config.read_address(), 0x00);
        assert_eq!(Register::Config.write_address(), 0x80);
        assert_eq!(Register::RtdMsb.read_address(), 0x01);
        assert_eq!(Register::FaultStatus.write_address(), 0x87);
    }

    #[test]
    fn config_bits() {
        let config = Config::default()
            .with_wires(Wires::Three)
            .with_bias(false)
            .with_auto_convert(false);
        assert_eq!(config.bits(), 0x10);

        assert_eq!(Config::from_bits(0x10).with_bias(true).bits(), 0x90);
        assert_eq!(Config::from_bits(0x90).with_one_shot().bits(), 0xb0);
        assert_eq!(Config::from_bits(0xd1).with_auto_convert(false).bits(), 0x91);
        assert_eq!(Config::from_bits(0x10).with_wires(Wires::Four).bits(), 0x00);
        assert_eq!(Config::from_bits(0x00).with_filter_50hz(true).bits(), 0x01);
    }

    #[test]
    fn fault_clear_keeps_other_bits() {
        // Same as `(config & !0x2c) | 0x02`.
        for bits in [0x00, 0x10, 0x90, 0xbd, 0xff] {
            assert_eq!(
                Config::from_bits(bits).with_fault_clear().bits(),
                (bits & !0x2c) | 0x02
            );
        }
    }

    #[test]
    fn fault_status() {
        assert!(!decode_fault_status(0x00).any());
        assert_eq!(
            decode_fault_status(0x84),
            FaultStatus {
                high_threshold: true,
                over_under_voltage: true,
                ..FaultStatus::default()
            }
        );
        assert_eq!(
            decode_fault_status(0x28),
            FaultStatus {
                refin_high: true,
                rtdin_low: true,
                ..FaultStatus::default()
            }
        );
    }

    #[test]
    fn rtd_code() -> Result<()> {
        assert_eq!(decode_rtd(RtdPayload::new([0x44, 0x3a]))?, 8733);
        assert_eq!(decode_rtd(RtdPayload::new([0xff, 0xfe]))?, 0x7fff);
        assert_eq!(decode_rtd(RtdPayload::new([0x44, 0x3b])), Err(Error::Fault));
        assert_eq!(ratio_code(RtdPayload::new([0x44, 0x3b])), 8733);
        Ok(())
    }

    #[test]
    fn typical_temperatures() -> Result<()> {
        let temp = decode(RtdPayload::new([0x44, 0x3a]))?;
        assert_float_eq!(temp.get::<degree_celsius>(), 39.998, abs <= 1e-3);

        let temp = decode(RtdPayload::new([0x3b, 0x88]))?;
        assert_float_eq!(temp.get::<degree_celsius>(), -0.0167, abs <= 1e-3);

        let temp = decode(RtdPayload::new([0x51, 0x44]))?;
        assert_float_eq!(temp.get::<degree_celsius>(), 100.0023, abs <= 1e-3);

        assert_float_eq!(resistance(8000).get::<ohm>(), 104.98, abs <= 1e-2);
        Ok(())
    }

    #[test]
    fn shorted_probe() {
        // A shorted probe reads close to 0Ω, far below the Pt100 range.
        assert!(matches!(
            decode(RtdPayload::new([0x00, 0x02])),
            Err(Error::InvalidTemperature(_))
        ));
    }
}

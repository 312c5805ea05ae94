//! SCD30 CO2, temperature and humidity sensor encoding.
//!
//! # Encoding
//!
//! Commands are a 16 bit code, optionally followed by a 16 bit argument and the
//! argument's CRC, most significant byte first:
//!
//! ```txt
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Command code          |           Argument            |      CRC      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Responses are a sequence of words, each followed by its own CRC:
//!
//! ```txt
//!  0                   1                   2
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             Value             |      CRC      |  ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Measurements are IEEE-754 single precision floats sent as two words, high word
//! first.
//!
//! See: [interface description] § 1.4.
//!
//! [interface description]: https://sensirion.com/media/documents/D7CEEF4A/6165372F/Sensirion_CO2_Sensors_SCD30_Interface_Description.pdf
use core::ops::Deref;

use crate::crc;

/// Size of a response word, including its CRC.
pub const WORD_SIZE: usize = 3;
/// Readiness word reported when a measurement is available.
pub const DATA_READY: u16 = 1;

/// Represents an SCD30 command.
///
/// See: [interface description] § 1.4.
///
/// [interface description]: https://sensirion.com/media/documents/D7CEEF4A/6165372F/Sensirion_CO2_Sensors_SCD30_Interface_Description.pdf
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Command {
    StartContinuousMeasurement = 0x0010,
    StopContinuousMeasurement = 0x0104,
    SetMeasurementInterval = 0x4600,
    GetReadyStatus = 0x0202,
    ReadMeasurement = 0x0300,
    AutomaticSelfCalibration = 0x5306,
    ForcedRecalibration = 0x5204,
    SetTemperatureOffset = 0x5403,
    SetAltitudeCompensation = 0x5102,
    SoftReset = 0xd304,
    ReadSerialNumber = 0xd033,
    ReadArticleCode = 0xd025,
    StartSingleMeasurement = 0x0006,
}

impl Command {
    /// Returns the wire code of the command.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// An encoded command, ready to be written to the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; 5],
    len: usize,
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Encodes a command without an argument.
#[must_use]
pub fn encode_simple(command: Command) -> Frame {
    let [code_high, code_low] = command.code().to_be_bytes();
    Frame {
        bytes: [code_high, code_low, 0, 0, 0],
        len: 2,
    }
}

/// Encodes a command with a 16 bit argument and its CRC.
#[must_use]
pub fn encode_with_arg(command: Command, arg: u16) -> Frame {
    let [code_high, code_low] = command.code().to_be_bytes();
    let [arg_high, arg_low] = arg.to_be_bytes();
    Frame {
        bytes: [code_high, code_low, arg_high, arg_low, crc::compute(arg)],
        len: 5,
    }
}

/// Represents a received word and the CRC that came with it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Word {
    pub value: u16,
    pub crc: u8,
}

impl Word {
    /// Checks the word against its CRC, returning the value if it matches.
    pub fn validate(self) -> crc::Result<u16> {
        crc::verify(self.value, self.crc).map(|()| self.value)
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.validate().is_ok()
    }
}

/// Decodes a response word. The CRC is carried along unchecked, see
/// [`Word::validate`].
#[must_use]
pub fn decode_word(chunk: &[u8; WORD_SIZE]) -> Word {
    Word {
        value: u16::from_be_bytes([chunk[0], chunk[1]]),
        crc: chunk[2],
    }
}

/// Reassembles a measurement float from its high and low words.
#[must_use]
pub fn decode_float(high: u16, low: u16) -> f32 {
    raw::to_f32(raw::combine(high, low))
}

pub mod raw {
    /// Combines two words into the 32 bit pattern they were split from.
    #[must_use]
    pub fn combine(high: u16, low: u16) -> u32 {
        (u32::from(high) << 16) | u32::from(low)
    }

    /// Reinterprets a 32 bit pattern as an IEEE-754 float. No numeric conversion
    /// takes place.
    #[must_use]
    pub fn to_f32(bits: u32) -> f32 {
        f32::from_bits(bits)
    }
}

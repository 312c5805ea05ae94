//! Readings frame for the companion microcontroller.
//!
//! Each value is sent as a fixed six byte frame over the UART:
//!
//! ```txt
//! +------+---------+------+-------+--------+------+
//! | 0xAA | channel | tens | units | tenths | 0xF0 |
//! +------+---------+------+-------+--------+------+
//! ```
//!
//! The three digits are ASCII, so only values in `0 ≤ v < 100` fit.

pub const START: u8 = 0xAA;
pub const END: u8 = 0xF0;
pub const FRAME_LEN: usize = 6;

pub type Frame = [u8; FRAME_LEN];
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("value out of range: expected 0≤x<100, got {0}")]
    OutOfRange(f32),
}

/// Quantity carried by a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    Temperature = b'T',
    Humidity = b'H',
    Ph = b'P',
    Co2 = b'C',
    Viscosity = b'V',
}

/// Encodes `value` with one decimal place, truncating the rest.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode(channel: Channel, value: f32) -> Result<Frame> {
    if !(0.0..100.0).contains(&value) {
        return Err(Error::OutOfRange(value));
    }

    let whole = value as u8;
    let tenths = ((value * 10.0) as u16 % 10) as u8;

    Ok([
        START,
        channel as u8,
        b'0' + whole / 10,
        b'0' + whole % 10,
        b'0' + tenths,
        END,
    ])
}

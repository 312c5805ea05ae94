//! Sensirion CRC-8.
//!
//! Every 16 bit word exchanged with the SCD30 is followed by a CRC-8 byte computed
//! with the polynomial `x⁸ + x⁵ + x⁴ + 1` (`0x31`) and an initial value of `0xff`.
//!
//! See: [interface description] § 1.1.3.
//!
//! [interface description]: https://sensirion.com/media/documents/D7CEEF4A/6165372F/Sensirion_CO2_Sensors_SCD30_Interface_Description.pdf

pub type Result<T> = core::result::Result<T, Mismatch>;

/// `x⁸ + x⁵ + x⁴ + 1`, with the implicit `x⁸` term dropped.
pub const POLYNOMIAL: u8 = 0x31;
/// Initial accumulator value.
pub const INIT: u8 = 0xff;

/// Represents a CRC mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("checksum mismatched (expected {expected:#04x}, found {actual:#04x})")]
pub struct Mismatch {
    /// The checksum computed over the received value.
    pub expected: u8,
    /// The checksum that was received.
    pub actual: u8,
}

/// Computes the CRC of a 16 bit word, high byte first.
#[must_use]
pub const fn compute(seed: u16) -> u8 {
    let [high, low] = seed.to_be_bytes();
    shift_in(shift_in(INIT, high), low)
}

/// Checks a received CRC against the one computed for `seed`.
pub fn verify(seed: u16, received: u8) -> Result<()> {
    let expected = compute(seed);
    if expected == received {
        Ok(())
    } else {
        Err(Mismatch {
            expected,
            actual: received,
        })
    }
}

const fn shift_in(crc: u8, byte: u8) -> u8 {
    let mut crc = crc ^ byte;
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 0x80 == 0 {
            crc << 1
        } else {
            (crc << 1) ^ POLYNOMIAL
        };
        bit += 1;
    }
    crc
}

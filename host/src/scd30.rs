//! SCD30 CO2, temperature and humidity sensor driver.
//!
//! Every operation writes one command frame and, if the command has a response,
//! reads it back in the same call. Response words are checked in order and the first
//! failure ends the operation.
//!
//! See: [interface description].
//!
//! [interface description]: https://sensirion.com/media/documents/D7CEEF4A/6165372F/Sensirion_CO2_Sensors_SCD30_Interface_Description.pdf
use uom::si::{ratio::part_per_million, ratio::percent, thermodynamic_temperature::degree_celsius};

use crate::{
    crc,
    decode::scd30::{
        decode_word, encode_simple, encode_with_arg, raw, Command, Frame, DATA_READY, WORD_SIZE,
    },
    transport::{Address, Transport, TransportError},
    units::{Ratio, ThermodynamicTemperature},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Default SCD30 I2C address.
pub const DEFAULT_ADDRESS: Address = Address(0x61);
/// Length of the ASCII serial number buffer.
pub const SERIAL_NUMBER_LEN: usize = 24;
/// Number of words in a serial number response.
const SERIAL_NUMBER_WORDS: usize = 11;
/// Number of words in a measurement response.
const MEASUREMENT_WORDS: usize = 6;

/// Represents an SCD30 driver error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The sensor did not acknowledge a transfer.
    #[error("no acknowledge")]
    NoAcknowledge,
    /// A transfer timed out.
    #[error("bus timed out")]
    Timeout,
    /// A response word failed its CRC. `field` counts from 1 in response order, 0
    /// when the failing word is not known.
    #[error("checksum mismatched on word {field} (expected {expected:#x}, found {actual:#x})")]
    ChecksumMismatch { field: u8, expected: u8, actual: u8 },
}

impl Error {
    fn checksum(field: u8, mismatch: crc::Mismatch) -> Self {
        Error::ChecksumMismatch {
            field,
            expected: mismatch.expected,
            actual: mismatch.actual,
        }
    }

    /// Returns the numeric error code printed on the console.
    ///
    /// | code | meaning                   |
    /// |------|---------------------------|
    /// | 0    | no error                  |
    /// | 1    | data ready                |
    /// | 2    | no acknowledge            |
    /// | 3    | timeout                   |
    /// | 4    | checksum, unknown word    |
    /// | 5-10 | checksum on word 1 to 6   |
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Error::NoAcknowledge => 2,
            Error::Timeout => 3,
            Error::ChecksumMismatch { field, .. } => 4 + field,
        }
    }
}

impl From<TransportError> for Error {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::NoAcknowledge => Error::NoAcknowledge,
            TransportError::Timeout => Error::Timeout,
        }
    }
}

impl From<crc::Mismatch> for Error {
    fn from(value: crc::Mismatch) -> Self {
        Error::checksum(0, value)
    }
}

/// A measured quantity as it travels over the bus.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Quantity {
    /// High order word.
    pub high: u16,
    /// Low order word.
    pub low: u16,
    /// `high` and `low` combined.
    pub bits: u32,
    /// `bits` reinterpreted as a float.
    pub value: f32,
}

impl Quantity {
    fn reconstruct(&mut self) {
        self.bits = raw::combine(self.high, self.low);
        self.value = raw::to_f32(self.bits);
    }
}

/// Everything the driver has read from the sensor so far.
///
/// Response words are stored as they arrive, before their CRC is checked. When
/// a measurement read fails on word `k`, word `k` holds the rejected value and the
/// words after it still hold the previous read. The reconstructed floats are only
/// updated after all six words pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    /// CO2 concentration in ppm.
    pub co2: Quantity,
    /// Temperature in °C.
    pub temperature: Quantity,
    /// Relative humidity in %.
    pub humidity: Quantity,
    /// Last readiness word, `1` when a measurement is available.
    pub ready: u16,
    /// Last article code word, kept even when its CRC fails.
    pub article_code: u16,
    /// ASCII serial number, NUL padded.
    pub serial_number: [u8; SERIAL_NUMBER_LEN],
}

/// Represents a complete SCD30 measurement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Measurement {
    pub co2: Ratio,
    pub temperature: ThermodynamicTemperature,
    pub humidity: Ratio,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Measurement {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Measurement {{ co2: {}ppm, temperature: {}°C, humidity: {}% }}",
            self.co2.get::<part_per_million>(),
            self.temperature.get::<degree_celsius>(),
            self.humidity.get::<percent>(),
        );
    }
}

impl Record {
    /// Returns the last reconstructed measurement.
    #[must_use]
    pub fn measurement(&self) -> Measurement {
        Measurement {
            co2: Ratio::new::<part_per_million>(self.co2.value),
            temperature: ThermodynamicTemperature::new::<degree_celsius>(self.temperature.value),
            humidity: Ratio::new::<percent>(self.humidity.value),
        }
    }

    /// Returns the serial number up to its first NUL, if it is valid ASCII.
    #[must_use]
    pub fn serial(&self) -> Option<&str> {
        let end = self
            .serial_number
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SERIAL_NUMBER_LEN);
        let serial = &self.serial_number[..end];
        if serial.is_ascii() {
            core::str::from_utf8(serial).ok()
        } else {
            None
        }
    }
}

/// Represents an SCD30 sensor on a [`Transport`].
pub struct Scd30<T: Transport> {
    transport: T,
    address: Address,
    record: Record,
}

impl<T: Transport> Scd30<T> {
    /// Creates a new [`Scd30`] at the [`DEFAULT_ADDRESS`].
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, DEFAULT_ADDRESS)
    }

    pub fn with_address(transport: T, address: Address) -> Self {
        Self {
            transport,
            address,
            record: Record::default(),
        }
    }

    /// Returns what has been read from the sensor so far.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Releases the underlying transport.
    pub fn release(self) -> T {
        self.transport
    }

    /// Starts continuous measurement. A pressure of 0 disables pressure
    /// compensation, otherwise it is the ambient pressure in mbar.
    pub async fn start_measurement(&mut self, pressure_mbar: u16) -> Result<()> {
        self.send(encode_with_arg(
            Command::StartContinuousMeasurement,
            pressure_mbar,
        ))
        .await
    }

    /// Triggers a single measurement, see [`Scd30::start_measurement`].
    pub async fn start_single_measurement(&mut self, pressure_mbar: u16) -> Result<()> {
        self.send(encode_with_arg(Command::StartSingleMeasurement, pressure_mbar))
            .await
    }

    pub async fn stop_measurement(&mut self) -> Result<()> {
        self.send(encode_simple(Command::StopContinuousMeasurement))
            .await
    }

    /// Sets the continuous measurement interval, in seconds.
    pub async fn set_measurement_interval(&mut self, seconds: u16) -> Result<()> {
        self.send(encode_with_arg(Command::SetMeasurementInterval, seconds))
            .await
    }

    /// Sets the temperature offset, in hundredths of a degree.
    pub async fn set_temperature_offset(&mut self, centi_degrees: u16) -> Result<()> {
        self.send(encode_with_arg(Command::SetTemperatureOffset, centi_degrees))
            .await
    }

    /// Sets the altitude above sea level, in meters.
    pub async fn set_altitude_compensation(&mut self, meters: u16) -> Result<()> {
        self.send(encode_with_arg(Command::SetAltitudeCompensation, meters))
            .await
    }

    /// Enables or disables automatic self calibration.
    pub async fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<()> {
        self.send(encode_with_arg(
            Command::AutomaticSelfCalibration,
            u16::from(enabled),
        ))
        .await
    }

    /// Calibrates the sensor against a known CO2 concentration, in ppm.
    pub async fn set_forced_recalibration(&mut self, ppm: u16) -> Result<()> {
        self.send(encode_with_arg(Command::ForcedRecalibration, ppm))
            .await
    }

    pub async fn soft_reset(&mut self) -> Result<()> {
        self.send(encode_simple(Command::SoftReset)).await
    }

    /// Queries whether a measurement is available.
    ///
    /// The raw readiness word is kept in [`Record::ready`] even when its CRC fails.
    pub async fn get_ready_status(&mut self) -> Result<bool> {
        let mut chunk = [0; WORD_SIZE];
        self.query(Command::GetReadyStatus, &mut chunk).await?;

        let word = decode_word(&chunk);
        self.record.ready = word.value;
        word.validate().map_err(|e| Error::checksum(1, e))?;
        Ok(word.value == DATA_READY)
    }

    /// Reads the CO2, temperature and humidity measurement.
    pub async fn read_measurement(&mut self) -> Result<()> {
        let mut chunks = [[0; WORD_SIZE]; MEASUREMENT_WORDS];
        self.query(Command::ReadMeasurement, chunks.as_flattened_mut())
            .await?;

        let Record {
            co2,
            temperature,
            humidity,
            ..
        } = &mut self.record;
        let fields = [
            &mut co2.high,
            &mut co2.low,
            &mut temperature.high,
            &mut temperature.low,
            &mut humidity.high,
            &mut humidity.low,
        ];

        for ((chunk, field), index) in chunks.iter().zip(fields).zip(1..) {
            let word = decode_word(chunk);
            *field = word.value;
            word.validate().map_err(|e| Error::checksum(index, e))?;
        }

        co2.reconstruct();
        temperature.reconstruct();
        humidity.reconstruct();
        trace!(
            "scd30 raw measurement: {:#x} {:#x} {:#x}",
            co2.bits,
            temperature.bits,
            humidity.bits
        );
        Ok(())
    }

    /// Reads the ASCII serial number into [`Record::serial_number`].
    ///
    /// Words are copied until a zero word ends the string; anything after it is
    /// ignored, CRC included.
    pub async fn get_serial_number(&mut self) -> Result<()> {
        let mut chunks = [[0; WORD_SIZE]; SERIAL_NUMBER_WORDS];
        self.send(encode_simple(Command::ReadSerialNumber)).await?;
        self.record.serial_number = [0; SERIAL_NUMBER_LEN];
        self.transport
            .read(self.address, chunks.as_flattened_mut())
            .await?;

        let serial = self.record.serial_number.chunks_exact_mut(2);
        for (chunk, bytes) in chunks.iter().zip(serial) {
            let word = decode_word(chunk);
            bytes.copy_from_slice(&word.value.to_be_bytes());
            word.validate().map_err(|e| Error::checksum(1, e))?;
            if word.value == 0 {
                break;
            }
        }

        Ok(())
    }

    pub async fn get_article_code(&mut self) -> Result<u16> {
        let mut chunk = [0; WORD_SIZE];
        self.query(Command::ReadArticleCode, &mut chunk).await?;

        let word = decode_word(&chunk);
        self.record.article_code = word.value;
        word.validate().map_err(|e| Error::checksum(1, e))
    }

    /// Writes a command that has no response.
    async fn send(&mut self, frame: Frame) -> Result<()> {
        Ok(self.transport.write(self.address, &frame).await?)
    }

    /// Writes a command and reads its response into `buffer`.
    async fn query(&mut self, command: Command, buffer: &mut [u8]) -> Result<()> {
        self.send(encode_simple(command)).await?;
        Ok(self.transport.read(self.address, buffer).await?)
    }
}

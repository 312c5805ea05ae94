//! SCD30 bus access over the RP2040 I2C peripheral.
use co2_monitor::transport::{Address, Transport, TransportError};
use defmt::debug;
use embassy_rp::{i2c, interrupt::typelevel::Binding, Peripheral};
use embassy_time::{with_timeout, Duration};

pub use co2_monitor::scd30::{Error, Measurement, Record, DEFAULT_ADDRESS};

/// SCD30 driver bound to an I2C peripheral.
pub type Scd30<'a, T> = co2_monitor::Scd30<I2cTransport<'a, T>>;

/// Standard mode, the SCD30 supports up to 100kHz.
pub const FREQUENCY_HZ: u32 = 100_000;
/// Longest a single transfer may take, including clock stretching.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(100);

/// An async I2C bus with a per-transfer timeout.
pub struct I2cTransport<'a, T: i2c::Instance> {
    i2c: i2c::I2c<'a, T, i2c::Async>,
    timeout: Duration,
}

impl<'a, T: i2c::Instance> I2cTransport<'a, T> {
    #[must_use]
    pub fn new(
        peripheral: impl Peripheral<P = T> + 'a,
        scl_pin: impl Peripheral<P = impl i2c::SclPin<T>> + 'a,
        sda_pin: impl Peripheral<P = impl i2c::SdaPin<T>> + 'a,
        irq: impl Binding<T::Interrupt, i2c::InterruptHandler<T>>,
    ) -> Self {
        let mut config = i2c::Config::default();
        config.frequency = FREQUENCY_HZ;

        Self {
            i2c: i2c::I2c::new_async(peripheral, scl_pin, sda_pin, irq, config),
            timeout: TRANSFER_TIMEOUT,
        }
    }

    /// Wraps the transport in an SCD30 driver at the default address.
    #[must_use]
    pub fn into_scd30(self) -> Scd30<'a, T> {
        co2_monitor::Scd30::new(self)
    }
}

impl<'a, T: i2c::Instance> Transport for I2cTransport<'a, T> {
    async fn write(&mut self, address: Address, bytes: &[u8]) -> Result<(), TransportError> {
        let transfer = self.i2c.write_async(u16::from(*address), bytes.iter().copied());
        match with_timeout(self.timeout, transfer).await {
            Ok(result) => result.map_err(to_transport_error),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn read(&mut self, address: Address, buffer: &mut [u8]) -> Result<(), TransportError> {
        let transfer = self.i2c.read_async(u16::from(*address), buffer);
        match with_timeout(self.timeout, transfer).await {
            Ok(result) => result.map_err(to_transport_error),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// Any abort is reported as a missing acknowledge, the sensor has no other way to
/// refuse a transfer.
fn to_transport_error(error: i2c::Error) -> TransportError {
    debug!("i2c error: {}", error);
    TransportError::NoAcknowledge
}

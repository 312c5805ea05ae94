//! Byte-level bus access used by the sensor drivers.

/// Represents a 7 bit bus address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_more::Deref)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub u8);

/// Represents a transport failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The device did not acknowledge its address or a data byte.
    #[error("no acknowledge")]
    NoAcknowledge,
    /// The transfer did not complete in time.
    #[error("bus timed out")]
    Timeout,
}

/// A blocking-per-transfer bus. Each call is a complete transaction; nothing else may
/// use the bus until it returns.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Writes `bytes` to the device at `address`.
    async fn write(&mut self, address: Address, bytes: &[u8]) -> Result<(), TransportError>;

    /// Fills `buffer` with bytes read from the device at `address`.
    async fn read(&mut self, address: Address, buffer: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: Transport> Transport for &mut T {
    async fn write(&mut self, address: Address, bytes: &[u8]) -> Result<(), TransportError> {
        T::write(self, address, bytes).await
    }

    async fn read(&mut self, address: Address, buffer: &mut [u8]) -> Result<(), TransportError> {
        T::read(self, address, buffer).await
    }
}

//! Readings link to the companion microcontroller.
use co2_monitor::telemetry::{self, Channel};
use defmt::trace;
use embassy_rp::{dma, uart, Peripheral};

type Result<T> = core::result::Result<T, Error>;

pub const BAUD_RATE: u32 = 9600;

#[derive(Debug, thiserror::Error, defmt::Format)]
pub enum Error {
    #[error("encode error: {0}")]
    EncodeError(#[from] telemetry::Error),
    #[error("uart error")]
    UartError(uart::Error),
}

impl From<uart::Error> for Error {
    fn from(value: uart::Error) -> Self {
        Error::UartError(value)
    }
}

pub struct TelemetryLink<'a, T: uart::Instance> {
    tx: uart::UartTx<'a, T, uart::Async>,
}

impl<'a, T: uart::Instance> TelemetryLink<'a, T> {
    #[must_use]
    pub fn new(
        peripheral: impl Peripheral<P = T> + 'a,
        tx_pin: impl Peripheral<P = impl uart::TxPin<T>> + 'a,
        tx_dma: impl Peripheral<P = impl dma::Channel> + 'a,
    ) -> Self {
        let mut config = uart::Config::default();
        config.baudrate = BAUD_RATE;

        Self {
            tx: uart::UartTx::new(peripheral, tx_pin, tx_dma, config),
        }
    }

    pub async fn send(&mut self, channel: Channel, value: f32) -> Result<()> {
        let frame = telemetry::encode(channel, value)?;
        trace!("telemetry frame: {=[u8]:#x}", &frame[..]);
        self.tx.write(&frame).await?;
        Ok(())
    }
}

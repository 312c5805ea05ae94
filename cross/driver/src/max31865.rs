//! MAX31865 RTD converter over SPI.
use co2_monitor::{
    decode::{
        self,
        max31865::{Config, FaultStatus, Register, RtdPayload},
    },
    units::ThermodynamicTemperature,
};
use defmt::trace;
use embassy_rp::{dma, gpio, spi, Peripheral};
use embassy_time::{Duration, Timer};

pub use co2_monitor::decode::max31865::Wires;

type Result<T> = core::result::Result<T, Error>;

/// The converter only supports SPI modes 1 and 3.
pub const FREQUENCY_HZ: u32 = 500_000;
/// One-shot conversion time with the 60Hz filter, rounded up.
pub const CONVERSION_TIME: Duration = Duration::from_millis(65);

/// Represents a MAX31865 driver error.
#[derive(Debug, thiserror::Error, defmt::Format)]
pub enum Error {
    #[error("decode error: {0}")]
    DecodeError(#[from] decode::max31865::Error),
    #[error("spi error")]
    SpiError(spi::Error),
}

impl From<spi::Error> for Error {
    fn from(value: spi::Error) -> Self {
        Error::SpiError(value)
    }
}

pub struct Max31865<'a, T: spi::Instance> {
    spi: spi::Spi<'a, T, spi::Async>,
    cs: gpio::Output<'a>,
}

impl<'a, T: spi::Instance> Max31865<'a, T> {
    #[must_use]
    pub fn new(
        peripheral: impl Peripheral<P = T> + 'a,
        clk_pin: impl Peripheral<P = impl spi::ClkPin<T>> + 'a,
        mosi_pin: impl Peripheral<P = impl spi::MosiPin<T>> + 'a,
        miso_pin: impl Peripheral<P = impl spi::MisoPin<T>> + 'a,
        tx_dma: impl Peripheral<P = impl dma::Channel> + 'a,
        rx_dma: impl Peripheral<P = impl dma::Channel> + 'a,
        cs_pin: impl Peripheral<P = impl gpio::Pin> + 'a,
    ) -> Self {
        let mut config = spi::Config::default();
        config.frequency = FREQUENCY_HZ;
        config.polarity = spi::Polarity::IdleLow;
        config.phase = spi::Phase::CaptureOnSecondTransition;

        Self {
            spi: spi::Spi::new(
                peripheral, clk_pin, mosi_pin, miso_pin, tx_dma, rx_dma, config,
            ),
            cs: gpio::Output::new(cs_pin, gpio::Level::High),
        }
    }

    /// Configures the probe wiring and leaves the converter idle with faults cleared.
    pub async fn begin(&mut self, wires: Wires) -> Result<()> {
        self.update_config(|config| config.with_wires(wires)).await?;
        self.update_config(|config| config.with_bias(false)).await?;
        self.update_config(|config| config.with_auto_convert(false))
            .await?;
        self.clear_fault().await
    }

    pub async fn clear_fault(&mut self) -> Result<()> {
        self.update_config(Config::with_fault_clear).await
    }

    pub async fn read_fault(&mut self) -> Result<FaultStatus> {
        let mut payload = [0; 1];
        self.read_registers(Register::FaultStatus, &mut payload)
            .await?;
        Ok(decode::max31865::decode_fault_status(payload[0]))
    }

    /// Runs a one-shot conversion and returns the raw RTD registers.
    pub async fn read_payload(&mut self) -> Result<RtdPayload> {
        self.clear_fault().await?;
        self.update_config(|config| config.with_bias(true)).await?;
        self.update_config(Config::with_one_shot).await?;
        Timer::after(CONVERSION_TIME).await;

        let mut payload = RtdPayload::ZERO;
        self.read_registers(Register::RtdMsb, payload.as_raw_mut_slice())
            .await?;
        trace!("rtd payload: {=[u8]:#x}", payload.as_raw_slice());
        Ok(payload)
    }

    /// Runs a one-shot conversion and returns the 15 bit ratio code, without the
    /// fault flag.
    pub async fn read_rtd(&mut self) -> Result<u16> {
        let payload = self.read_payload().await?;
        Ok(decode::max31865::ratio_code(payload))
    }

    /// Runs a one-shot conversion and converts it to a temperature.
    pub async fn temp(&mut self) -> Result<ThermodynamicTemperature> {
        let payload = self.read_payload().await?;
        Ok(decode::max31865::decode(payload)?)
    }

    async fn update_config(&mut self, f: impl FnOnce(Config) -> Config) -> Result<()> {
        let mut payload = [0; 1];
        self.read_registers(Register::Config, &mut payload).await?;
        let config = f(Config::from_bits(payload[0]));
        self.write_register(Register::Config, config.bits()).await
    }

    async fn read_registers(&mut self, register: Register, buffer: &mut [u8]) -> Result<()> {
        self.cs.set_low();
        let result = self.transfer_read(register, buffer).await;
        self.cs.set_high();
        result
    }

    async fn transfer_read(&mut self, register: Register, buffer: &mut [u8]) -> Result<()> {
        self.spi.write(&[register.read_address()]).await?;
        buffer.fill(0xff);
        self.spi.transfer_in_place(buffer).await?;
        Ok(())
    }

    async fn write_register(&mut self, register: Register, value: u8) -> Result<()> {
        self.cs.set_low();
        let result = self.spi.write(&[register.write_address(), value]).await;
        self.cs.set_high();
        Ok(result?)
    }
}
